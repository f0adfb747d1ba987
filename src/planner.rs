//! Dual-profile bike route planning.
//!
//! A plan request fans out to the routing provider once per profile, waits for
//! every call to settle, and keeps the profiles that produced a route. A
//! failing profile is logged and dropped; it never fails the request.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::providers::{Coordinate, DirectionsResponse, ProviderError, RoutingProvider};

/// A routing preference offered to the user, and the provider mode behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingProfile {
    pub label: &'static str,
    pub provider_profile: &'static str,
}

/// Profiles in the order they are returned to the client.
pub const PROFILES: [RoutingProfile; 2] = [
    RoutingProfile {
        label: "rapide",
        provider_profile: "cycling-road",
    },
    RoutingProfile {
        label: "securise",
        provider_profile: "cycling-regular",
    },
];

/// One planned route, as the mobile client consumes it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedRoute {
    #[serde(rename = "type")]
    pub kind: String,
    /// Kilometers, one decimal
    pub distance: String,
    /// Minutes
    pub duree: i64,
    pub trace: Vec<Coordinate>,
}

impl FormattedRoute {
    /// Build from the first feature of a provider answer, `None` when the
    /// provider found no route.
    pub fn from_directions(label: &str, directions: DirectionsResponse) -> Option<Self> {
        let feature = directions.features.into_iter().next()?;
        let summary = feature.properties.summary;

        let trace = feature
            .geometry
            .coordinates
            .into_iter()
            .filter_map(|position| match position.as_slice() {
                [lon, lat, ..] => Some([*lon, *lat]),
                _ => None,
            })
            .collect();

        Some(Self {
            kind: label.to_string(),
            distance: format_km(summary.distance),
            duree: minutes(summary.duration),
            trace,
        })
    }
}

/// Half-up to the tenth of a kilometer: 1250 m is "1.3".
fn format_km(meters: f64) -> String {
    format!("{:.1}", (meters / 100.0).round() / 10.0)
}

fn minutes(seconds: f64) -> i64 {
    (seconds / 60.0).round() as i64
}

#[derive(Clone)]
pub struct RoutePlanner {
    provider: Arc<dyn RoutingProvider>,
    profiles: Vec<RoutingProfile>,
}

impl RoutePlanner {
    pub fn new(provider: Arc<dyn RoutingProvider>) -> Self {
        Self {
            provider,
            profiles: PROFILES.to_vec(),
        }
    }

    /// Plan `start` → `end` for every profile concurrently.
    ///
    /// The result keeps profile order and contains only the profiles the
    /// provider resolved; it may be empty.
    pub async fn plan(&self, start: Coordinate, end: Coordinate) -> Vec<FormattedRoute> {
        let calls = self
            .profiles
            .iter()
            .map(|profile| self.provider.directions(profile.provider_profile, start, end));
        let outcomes = join_all(calls).await;

        self.profiles
            .iter()
            .zip(outcomes)
            .filter_map(|(profile, outcome)| collect_outcome(profile, outcome))
            .collect()
    }
}

fn collect_outcome(
    profile: &RoutingProfile,
    outcome: Result<DirectionsResponse, ProviderError>,
) -> Option<FormattedRoute> {
    match outcome {
        Ok(directions) => {
            let route = FormattedRoute::from_directions(profile.label, directions);
            if route.is_none() {
                tracing::warn!(
                    profile = profile.label,
                    provider_profile = profile.provider_profile,
                    "routing provider returned no route"
                );
            }
            route
        }
        Err(e) => {
            tracing::warn!(
                profile = profile.label,
                provider_profile = profile.provider_profile,
                error = %e,
                "route planning failed for profile"
            );
            None
        }
    }
}
