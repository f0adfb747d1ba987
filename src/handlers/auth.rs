use axum::{extract::State, Json};

use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, Result};
use crate::models::*;
use crate::providers::{GoogleProfile, TokenVerification};
use crate::AppState;

use super::{non_empty, AppJson};

pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<Json<SignupResponse>> {
    let (Some(username), Some(email), Some(password)) = (
        non_empty(req.username),
        non_empty(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::InvalidRequest(
            "Error! 'username', 'email' and 'password' are required.".into(),
        ));
    };

    let roles = match req.roles {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|name| {
                Role::parse(name).ok_or_else(|| {
                    AppError::InvalidRequest(format!("Failed! Role does not exist = {name}"))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        _ => vec![Role::User],
    };

    let user = state.db.create_user(NewUser {
        username,
        email,
        password_hash: hash_password(&password)?,
        google_id: None,
        roles,
    })?;
    tracing::info!(user_id = user.id, "user registered");

    let token = state.tokens.issue(user.id)?;
    Ok(Json(SignupResponse {
        message: "User was registered successfully!".into(),
        auth: AuthResponse::new(&user, token),
    }))
}

pub async fn signin(
    State(state): State<AppState>,
    AppJson(req): AppJson<SigninRequest>,
) -> Result<Json<AuthResponse>> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(AppError::InvalidRequest(
            "Error! 'username' and 'password' are required.".into(),
        ));
    };

    let user = state
        .db
        .find_user_by_username(&username)?
        .ok_or_else(|| AppError::NotFound("User Not found.".into()))?;

    if !verify_password(&password, &user.password)? {
        return Err(AppError::InvalidPassword);
    }

    let token = state.tokens.issue(user.id)?;
    Ok(Json(AuthResponse::new(&user, token)))
}

pub async fn google_sign_in(
    State(state): State<AppState>,
    AppJson(req): AppJson<GoogleSignInRequest>,
) -> Result<Json<AuthResponse>> {
    let Some(token) = non_empty(req.id_token) else {
        return Err(AppError::InvalidRequest("Missing Google token".into()));
    };

    let profile = match state.identity.verify(&token).await {
        TokenVerification::IdToken(profile) => {
            tracing::info!("Google token verified as ID token");
            profile
        }
        TokenVerification::AccessToken(profile) => {
            tracing::info!("Google token verified as access token");
            profile
        }
        TokenVerification::Failed(reason) => {
            tracing::warn!(%reason, "Google token rejected");
            return Err(AppError::InvalidRequest(format!(
                "Invalid Google token: {reason}"
            )));
        }
    };

    let Some(email) = non_empty(profile.email.clone()) else {
        return Err(AppError::InvalidRequest(
            "Google account has no email address".into(),
        ));
    };

    let user = match state.db.find_user_by_email(&email)? {
        Some(user) if user.google_id.is_none() => {
            tracing::info!(user_id = user.id, "linking Google account to existing user");
            state
                .db
                .link_google_id(user.id, &profile.subject)?
                .ok_or(AppError::Unauthorized)?
        }
        Some(user) => user,
        None => create_google_user(&state, &profile, &email)?,
    };

    let token = state.tokens.issue(user.id)?;
    Ok(Json(AuthResponse::new(&user, token)))
}

/// Register a first-time Google user. The username is the display name, or
/// the local part of the email; the full email is the last resort when both
/// are taken.
fn create_google_user(state: &AppState, profile: &GoogleProfile, email: &str) -> Result<User> {
    let local_part = email.split('@').next().unwrap_or(email);
    let candidates = profile
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .into_iter()
        .chain([local_part, email]);

    for username in candidates {
        if state.db.find_user_by_username(username)?.is_some() {
            continue;
        }
        let user = state.db.create_user(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(&profile.subject)?,
            google_id: Some(profile.subject.clone()),
            roles: vec![Role::User],
        })?;
        tracing::info!(user_id = user.id, "registered Google user");
        return Ok(user);
    }

    Err(AppError::Duplicate(
        "Failed! Username is already in use!".into(),
    ))
}
