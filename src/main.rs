use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use velo_server::providers::{GoogleIdentityClient, OpenRouteServiceClient, OpenWeatherClient};
use velo_server::{create_router, AppState, Config, Database, TokenService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::open(&config.db_path)?;
    let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_secs);
    let identity = GoogleIdentityClient::new(config.google.clone())?;
    let routing = OpenRouteServiceClient::new(config.routing.clone())?;
    let weather = OpenWeatherClient::new(config.weather.clone())?;

    let state = AppState::new(
        db,
        tokens,
        Arc::new(identity),
        Arc::new(routing),
        Arc::new(weather),
    );
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
