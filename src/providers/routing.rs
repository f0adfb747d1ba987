//! OpenRouteService directions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::error::{success_body, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";

/// A `[longitude, latitude]` pair, in the order GeoJSON uses.
pub type Coordinate = [f64; 2];

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl RoutingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

// === Provider wire types ===

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: [Coordinate; 2],
}

/// GeoJSON feature collection returned by the `/geojson` directions endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: FeatureProperties,
    #[serde(default)]
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub summary: Summary,
}

/// Route totals. The provider omits both fields for zero-length routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Summary {
    /// meters
    #[serde(default)]
    pub distance: f64,
    /// seconds
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Geometry {
    /// Positions, `[lon, lat]` optionally followed by elevation.
    #[serde(default)]
    pub coordinates: Vec<Vec<f64>>,
}

/// Something that can compute a directions feature collection for one
/// routing profile.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn directions(
        &self,
        profile: &str,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<DirectionsResponse, ProviderError>;
}

/// HTTP client for the OpenRouteService directions API.
#[derive(Debug, Clone)]
pub struct OpenRouteServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenRouteServiceClient {
    pub fn new(config: RoutingConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        // ORS takes the bare key in Authorization, no scheme
        let key =
            HeaderValue::from_str(&config.api_key).map_err(|_| ProviderError::InvalidCredential)?;
        headers.insert(AUTHORIZATION, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RoutingProvider for OpenRouteServiceClient {
    async fn directions(
        &self,
        profile: &str,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<DirectionsResponse, ProviderError> {
        let url = format!("{}/v2/directions/{}/geojson", self.base_url, profile);

        let response = self
            .http
            .post(&url)
            .json(&DirectionsRequest {
                coordinates: [start, end],
            })
            .send()
            .await?;

        let body = success_body(response).await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::json(e, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> OpenRouteServiceClient {
        OpenRouteServiceClient::new(RoutingConfig::new("ors-key").with_base_url(server.base_url()))
            .unwrap()
    }

    #[tokio::test]
    async fn posts_coordinates_to_profile_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/directions/cycling-road/geojson")
                    .header("authorization", "ors-key")
                    .json_body(json!({"coordinates": [[-0.55, 47.47], [-0.56, 47.48]]}));
                then.status(200).json_body(json!({
                    "type": "FeatureCollection",
                    "features": [{
                        "type": "Feature",
                        "properties": {"summary": {"distance": 1520.4, "duration": 301.2}},
                        "geometry": {"type": "LineString", "coordinates": [[-0.55, 47.47], [-0.56, 47.48]]}
                    }]
                }));
            })
            .await;

        let response = client(&server)
            .directions("cycling-road", [-0.55, 47.47], [-0.56, 47.48])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.features.len(), 1);
        assert_eq!(response.features[0].properties.summary.distance, 1520.4);
        assert_eq!(response.features[0].geometry.coordinates.len(), 2);
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/directions/cycling-regular/geojson");
                then.status(404)
                    .json_body(json!({"error": {"code": 2010, "message": "Could not find routable point"}}));
            })
            .await;

        let err = client(&server)
            .directions("cycling-regular", [0.0, 0.0], [1.0, 1.0])
            .await
            .unwrap_err();

        match err {
            ProviderError::Api { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("2010"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_summary_defaults_to_zero() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "features": [{"properties": {"summary": {}}, "geometry": {"coordinates": []}}]
                }));
            })
            .await;

        let response = client(&server)
            .directions("cycling-road", [1.0, 1.0], [1.0, 1.0])
            .await
            .unwrap();

        assert_eq!(response.features[0].properties.summary.distance, 0.0);
        assert_eq!(response.features[0].properties.summary.duration, 0.0);
    }

    #[test]
    fn rejects_key_with_newline() {
        let result = OpenRouteServiceClient::new(RoutingConfig::new("bad\nkey"));
        assert!(matches!(result, Err(ProviderError::InvalidCredential)));
    }
}
