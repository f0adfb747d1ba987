use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::*;
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<RouteWithAuthor>>> {
    Ok(Json(state.db.list_favorites(user.id)?))
}

pub async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(route_id): Path<u64>,
) -> Result<Json<MessageResponse>> {
    ensure_route(&state, route_id)?;

    state.db.add_favorite(user.id, route_id)?;
    Ok(Json(MessageResponse::new("Route added to favorites!")))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(route_id): Path<u64>,
) -> Result<Json<MessageResponse>> {
    ensure_route(&state, route_id)?;

    state.db.remove_favorite(user.id, route_id)?;
    Ok(Json(MessageResponse::new("Route removed from favorites!")))
}

fn ensure_route(state: &AppState, route_id: u64) -> Result<()> {
    match state.db.get_route(route_id)? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("Route not found!".into())),
    }
}
