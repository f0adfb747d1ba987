#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use velo_server::providers::{
    Coordinate, DirectionsResponse, IdentityVerifier, ProviderError, RoutingProvider,
    TokenVerification, WeatherProvider,
};
use velo_server::{create_router, AppState, Database, TokenService};

// === Fake providers ===

#[derive(Debug, Clone)]
pub enum Directions {
    /// One feature with the given summary (meters, seconds)
    Route { distance: f64, duration: f64 },
    NoFeatures,
    Fail,
}

/// Routing provider answering from a per-profile script. Unscripted profiles
/// fail.
pub struct FakeRouting {
    script: HashMap<String, Directions>,
    delay: Duration,
    calls: AtomicUsize,
    requests: std::sync::Mutex<Vec<(String, Coordinate, Coordinate)>>,
}

impl FakeRouting {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn answer(mut self, profile: &str, directions: Directions) -> Self {
        self.script.insert(profile.to_string(), directions);
        self
    }

    pub fn both(self, directions: Directions) -> Self {
        self.answer("cycling-road", directions.clone())
            .answer("cycling-regular", directions)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, Coordinate, Coordinate)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoutingProvider for FakeRouting {
    async fn directions(
        &self,
        profile: &str,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<DirectionsResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((profile.to_string(), start, end));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.script.get(profile) {
            Some(Directions::Route { distance, duration }) => Ok(serde_json::from_value(json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": {"summary": {"distance": distance, "duration": duration}},
                    "geometry": {"type": "LineString", "coordinates": [start, end]}
                }]
            }))
            .unwrap()),
            Some(Directions::NoFeatures) => Ok(DirectionsResponse::default()),
            Some(Directions::Fail) | None => Err(ProviderError::Api {
                status: 503,
                body: "upstream unavailable".into(),
            }),
        }
    }
}

pub struct FakeWeather {
    body: Option<Value>,
    calls: AtomicUsize,
}

impl FakeWeather {
    pub fn ok(body: Value) -> Self {
        Self {
            body: Some(body),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            body: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current(&self, _lat: f64, _lon: f64) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.body.clone().ok_or(ProviderError::Api {
            status: 401,
            body: "Invalid API key".into(),
        })
    }
}

pub struct FakeIdentity(pub TokenVerification);

#[async_trait]
impl IdentityVerifier for FakeIdentity {
    async fn verify(&self, _token: &str) -> TokenVerification {
        self.0.clone()
    }
}

// === Test server ===

pub struct TestApp {
    pub server: TestServer,
    pub routing: Arc<FakeRouting>,
    pub weather: Arc<FakeWeather>,
    _dir: TempDir,
}

pub fn setup_test_server() -> TestApp {
    setup_with(
        FakeRouting::new(),
        FakeWeather::failing(),
        FakeIdentity(TokenVerification::Failed("no identity provider".into())),
    )
}

pub fn setup_with(routing: FakeRouting, weather: FakeWeather, identity: FakeIdentity) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::open(db_path.to_str().unwrap()).unwrap();

    let routing = Arc::new(routing);
    let weather = Arc::new(weather);
    let state = AppState::new(
        db,
        TokenService::new("test-secret", 3600),
        Arc::new(identity),
        routing.clone(),
        weather.clone(),
    );
    let server = TestServer::new(create_router(state)).unwrap();

    TestApp {
        server,
        routing,
        weather,
        _dir: temp_dir,
    }
}

pub fn token_header() -> HeaderName {
    HeaderName::from_static("x-access-token")
}

pub fn token_value(token: &str) -> HeaderValue {
    HeaderValue::from_str(token).unwrap()
}

/// Register `username` and return its access token.
pub async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/auth/signup")
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "Passw0rd!"
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["accessToken"].as_str().unwrap().to_string()
}
