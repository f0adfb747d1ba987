pub mod auth;
pub mod comments;
pub mod external;
pub mod favorites;
pub mod routes;
pub mod users;

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::error::AppError;

/// JSON request body whose rejections answer with the usual `{message}` body.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

// === Health check ===

pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "state": "OK" }))
}

pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": 404, "message": "Route not found!" })),
    )
}

/// Trimmed, non-empty text field.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
