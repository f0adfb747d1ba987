use axum::{extract::State, Json};

use crate::auth::{require_role, AuthUser};
use crate::error::{AppError, Result};
use crate::models::*;
use crate::AppState;

use super::AppJson;

// === Access test boards ===

pub async fn all_access() -> &'static str {
    "Public Content."
}

pub async fn user_board(AuthUser(_): AuthUser) -> &'static str {
    "User Content."
}

pub async fn admin_board(AuthUser(user): AuthUser) -> Result<&'static str> {
    require_role(&user, Role::Admin)?;
    Ok("Admin Content.")
}

// === Profile ===

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>> {
    let Some(visible) = req.is_visible_on_map else {
        return Err(AppError::InvalidRequest(
            "Error! 'isVisibleOnMap' is required.".into(),
        ));
    };

    if !state.db.set_map_visibility(user.id, visible)? {
        return Err(AppError::NotFound("Cannot update profile.".into()));
    }
    Ok(Json(MessageResponse::new("Profile updated successfully.")))
}

pub async fn update_location(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(req): AppJson<UpdateLocationRequest>,
) -> Result<Json<MessageResponse>> {
    let (Some(lat), Some(lon)) = (req.lat, req.lon) else {
        return Err(AppError::InvalidRequest(
            "Error! 'lat' and 'lon' are required.".into(),
        ));
    };

    if !state.db.set_location(user.id, lat, lon)? {
        return Err(AppError::NotFound("Cannot update location.".into()));
    }
    tracing::debug!(user_id = user.id, lat, lon, "location updated");
    Ok(Json(MessageResponse::new("Location updated.")))
}
