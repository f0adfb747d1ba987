pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod planner;
pub mod providers;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use auth::TokenService;
pub use config::Config;
pub use db::Database;
pub use planner::RoutePlanner;

use providers::{IdentityVerifier, RoutingProvider, WeatherProvider};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub planner: RoutePlanner,
    pub weather: Arc<dyn WeatherProvider>,
}

impl AppState {
    pub fn new(
        db: Database,
        tokens: TokenService,
        identity: Arc<dyn IdentityVerifier>,
        routing: Arc<dyn RoutingProvider>,
        weather: Arc<dyn WeatherProvider>,
    ) -> Self {
        Self {
            db: Arc::new(db),
            tokens: Arc::new(tokens),
            identity,
            planner: RoutePlanner::new(routing),
            weather,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Accounts
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/signin", post(handlers::auth::signin))
        .route("/api/auth/google", post(handlers::auth::google_sign_in))
        .route("/api/test/all", get(handlers::users::all_access))
        .route("/api/test/user", get(handlers::users::user_board))
        .route("/api/test/admin", get(handlers::users::admin_board))
        .route("/api/user/profile", put(handlers::users::update_profile))
        .route("/api/user/location", post(handlers::users::update_location))
        // Routes, favorites, comments
        .route(
            "/api/routes",
            get(handlers::routes::list_public).post(handlers::routes::create),
        )
        .route("/api/routes/myroutes", get(handlers::routes::list_mine))
        .route("/api/routes/favorites", get(handlers::favorites::list))
        .route(
            "/api/routes/{id}",
            get(handlers::routes::get_one)
                .put(handlers::routes::update)
                .delete(handlers::routes::delete),
        )
        .route(
            "/api/routes/{id}/favorite",
            post(handlers::favorites::add).delete(handlers::favorites::remove),
        )
        .route("/api/routes/{id}/comment", post(handlers::comments::add))
        .route("/api/routes/{id}/comments", get(handlers::comments::list))
        // Third-party APIs
        .route("/api/external/weather", get(handlers::external::weather))
        .route("/api/external/plan-route", post(handlers::external::plan_route))
        // Health check
        .route("/healthcheck", get(handlers::healthcheck))
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
