//! Password hashing, access tokens and the request guard built on them.

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Role, User};
use crate::AppState;

const BCRYPT_COST: u32 = 8;
const ACCESS_TOKEN_HEADER: &str = "x-access-token";

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: u64,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks the HS256 access tokens handed to clients.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(&self, user_id: u64) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            id: user_id,
            iat: now,
            exp: now + self.ttl_secs as i64,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Returns the user id carried by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<u64> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.id)
            .map_err(|e| {
                tracing::debug!("rejected access token: {e}");
                AppError::Unauthorized
            })
    }
}

/// Token from `x-access-token`, or from `Authorization: Bearer`.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let direct = headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty());
    direct.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the calling user, or fail with 403 (no token) / 401 (bad token).
pub fn authorize(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = extract_token(headers).ok_or(AppError::NoToken)?;
    let user_id = state.tokens.verify(token)?;
    state.db.find_user(user_id)?.ok_or(AppError::Unauthorized)
}

/// The authenticated caller. Extracted from the request headers ahead of
/// the body, so a missing token is reported before any payload error.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authorize(state, &parts.headers).map(Self)
    }
}

pub fn require_role(user: &User, role: Role) -> Result<()> {
    if user.has_role(role) {
        return Ok(());
    }
    let message = match role {
        Role::Admin => "Require Admin Role!",
        Role::Moderator => "Require Moderator Role!",
        Role::User => "Require User Role!",
    };
    Err(AppError::Forbidden(message.into()))
}
