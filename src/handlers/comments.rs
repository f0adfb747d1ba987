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

pub async fn add(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(route_id): Path<u64>,
    AppJson(req): AppJson<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let Some(text) = non_empty(req.text) else {
        return Err(AppError::InvalidRequest(
            "Error! A comment cannot be empty.".into(),
        ));
    };

    if state.db.get_route(route_id)?.is_none() {
        return Err(AppError::NotFound("Route not found!".into()));
    }

    let comment = state.db.add_comment(user.id, route_id, &text)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(route_id): Path<u64>,
) -> Result<Json<Vec<CommentWithAuthor>>> {
    Ok(Json(state.db.list_comments(route_id)?))
}
