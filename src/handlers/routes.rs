use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::*;
use crate::AppState;

use super::{non_empty, AppJson};

fn route_not_found() -> AppError {
    AppError::NotFound("Route not found.".into())
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<RouteRequest>,
) -> Result<(StatusCode, Json<Route>)> {
    let Some(waypoints) = req.waypoints else {
        return Err(AppError::InvalidRequest(
            "Error! 'waypoints' is required.".into(),
        ));
    };
    let Some(name) = non_empty(req.name) else {
        return Err(AppError::InvalidRequest("Error! 'name' is required.".into()));
    };

    let route = state.db.create_route(
        user.id,
        NewRoute {
            name,
            description: req.description,
            is_public: req.is_public.unwrap_or(false),
            waypoints: waypoints_text(waypoints),
        },
    )?;
    tracing::info!(route_id = route.id, user_id = user.id, "route created");

    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn list_public(State(state): State<AppState>) -> Result<Json<Vec<RouteWithAuthor>>> {
    Ok(Json(state.db.list_public_routes()?))
}

pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Route>>> {
    Ok(Json(state.db.list_user_routes(user.id)?))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RouteWithAuthor>> {
    let route = state
        .db
        .get_route_with_author(id)?
        .ok_or_else(route_not_found)?;
    Ok(Json(route))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<u64>,
    AppJson(req): AppJson<RouteRequest>,
) -> Result<Json<Route>> {
    let route = state.db.get_route(id)?.ok_or_else(route_not_found)?;
    if route.user_id != user.id {
        return Err(AppError::Forbidden(
            "Not allowed to modify this route".into(),
        ));
    }

    let name = req
        .name
        .map(|name| {
            non_empty(Some(name))
                .ok_or_else(|| AppError::InvalidRequest("Error! 'name' cannot be empty.".into()))
        })
        .transpose()?;

    let changes = RouteChanges {
        name,
        description: req.description,
        is_public: req.is_public,
        waypoints: req.waypoints.map(waypoints_text),
    };
    let updated = state
        .db
        .update_route(id, changes)?
        .ok_or_else(route_not_found)?;
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<MessageResponse>> {
    let route = state.db.get_route(id)?.ok_or_else(route_not_found)?;
    if route.user_id != user.id {
        return Err(AppError::Forbidden(
            "Not allowed to delete this route".into(),
        ));
    }

    state.db.delete_route(id)?;
    tracing::info!(route_id = id, user_id = user.id, "route deleted");
    Ok(Json(MessageResponse::new("Route deleted successfully")))
}
