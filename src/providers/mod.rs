//! Clients for the third-party services the backend talks to.
//!
//! Each client sits behind a trait so handlers and the route planner can be
//! exercised against fakes. The concrete clients are built once in `main`
//! and shared through [`crate::AppState`].

mod error;
mod google;
mod routing;
mod weather;

pub use error::ProviderError;
pub use google::{
    GoogleConfig, GoogleIdentityClient, GoogleProfile, IdentityVerifier, TokenVerification,
};
pub use routing::{
    Coordinate, DirectionsResponse, Feature, FeatureProperties, Geometry,
    OpenRouteServiceClient, RoutingConfig, RoutingProvider, Summary,
};
pub use weather::{OpenWeatherClient, WeatherConfig, WeatherProvider};
