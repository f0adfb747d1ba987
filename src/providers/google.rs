//! Google Sign-In token verification.
//!
//! The mobile app sends whatever token the platform SDK gave it. Depending on
//! the platform this is either an OpenID ID token (a signed JWT whose audience
//! must be our client id) or a plain OAuth2 access token. Verification tries
//! the ID-token path first and falls back to the userinfo endpoint; the result
//! records which path succeeded.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::{success_body, ProviderError};

const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client id the ID token must be issued for
    pub client_id: String,
    pub tokeninfo_url: String,
    pub userinfo_url: String,
    pub timeout_secs: u64,
}

impl GoogleConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tokeninfo_url: DEFAULT_TOKENINFO_URL.to_string(),
            userinfo_url: DEFAULT_USERINFO_URL.to_string(),
            timeout_secs: 30,
        }
    }

    pub fn with_tokeninfo_url(mut self, url: impl Into<String>) -> Self {
        self.tokeninfo_url = url.into();
        self
    }

    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Identity claims common to both verification paths.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleProfile {
    /// Stable Google account id (`sub`)
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Outcome of verifying a client-supplied Google token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenVerification {
    IdToken(GoogleProfile),
    AccessToken(GoogleProfile),
    Failed(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> TokenVerification;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleIdentityClient {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleIdentityClient {
    pub fn new(config: GoogleConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    /// Validate an ID token through the tokeninfo endpoint, which checks the
    /// signature and expiry; audience and issuer are checked here.
    async fn verify_id_token(&self, token: &str) -> Result<GoogleProfile, ProviderError> {
        let response = self
            .http
            .get(&self.config.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await?;
        let body = success_body(response).await?;
        let info: TokenInfo =
            serde_json::from_str(&body).map_err(|e| ProviderError::json(e, &body))?;

        if info.aud != self.config.client_id {
            return Err(ProviderError::Rejected(format!(
                "token issued for another audience: {}",
                info.aud
            )));
        }
        if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
            return Err(ProviderError::Rejected(format!("unexpected issuer: {}", info.iss)));
        }

        Ok(GoogleProfile {
            subject: info.sub,
            email: info.email,
            name: info.name,
        })
    }

    async fn fetch_userinfo(&self, token: &str) -> Result<GoogleProfile, ProviderError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(token)
            .send()
            .await?;
        let body = success_body(response).await?;
        let info: UserInfo =
            serde_json::from_str(&body).map_err(|e| ProviderError::json(e, &body))?;

        Ok(GoogleProfile {
            subject: info.id,
            email: info.email,
            name: info.name,
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityClient {
    async fn verify(&self, token: &str) -> TokenVerification {
        match self.verify_id_token(token).await {
            Ok(profile) => return TokenVerification::IdToken(profile),
            Err(e) => tracing::debug!("not a valid ID token, trying as access token: {e}"),
        }

        match self.fetch_userinfo(token).await {
            Ok(profile) => TokenVerification::AccessToken(profile),
            Err(e) => TokenVerification::Failed(e.to_string()),
        }
    }
}
