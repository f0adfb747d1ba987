use thiserror::Error;

/// Errors from the outbound provider clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure (connection refused, timeout, TLS...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON parse error: {message}")]
    Json { message: String, body: String },

    /// Credential contains bytes that cannot go in a header
    #[error("invalid credential format")]
    InvalidCredential,

    /// Provider accepted the request but the answer is unusable
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub(crate) fn json(err: serde_json::Error, body: &str) -> Self {
        Self::Json {
            message: err.to_string(),
            body: body.chars().take(500).collect(),
        }
    }
}

/// Turn a response into its body text, mapping non-2xx statuses to
/// [`ProviderError::Api`].
pub(crate) async fn success_body(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.text().await?)
}
