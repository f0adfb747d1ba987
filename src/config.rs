use thiserror::Error;

use crate::providers::{GoogleConfig, RoutingConfig, WeatherConfig};

const DEFAULT_DB_PATH: &str = "velo.db";
const DEFAULT_PORT: &str = "8080";
const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is not set.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub port: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub routing: RoutingConfig,
    pub weather: WeatherConfig,
    pub google: GoogleConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout = optional_u64("PROVIDER_TIMEOUT_SECS", DEFAULT_PROVIDER_TIMEOUT_SECS)?;

        let mut routing = RoutingConfig::new(required("ORS_API_KEY")?).with_timeout(timeout);
        if let Ok(url) = std::env::var("ORS_BASE_URL") {
            routing = routing.with_base_url(url);
        }

        let mut weather =
            WeatherConfig::new(required("OPENWEATHER_API_KEY")?).with_timeout(timeout);
        if let Ok(url) = std::env::var("OPENWEATHER_BASE_URL") {
            weather = weather.with_base_url(url);
        }

        let google = GoogleConfig::new(required("GOOGLE_CLIENT_ID")?).with_timeout(timeout);

        Ok(Self {
            db_path: std::env::var("VELO_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.into()),
            port: std::env::var("VELO_PORT").unwrap_or_else(|_| DEFAULT_PORT.into()),
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_secs: optional_u64("JWT_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?,
            routing,
            weather,
            google,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
