use axum::{
    extract::{Query, State},
    Json,
};

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::models::*;
use crate::planner::FormattedRoute;
use crate::AppState;

use super::AppJson;

pub async fn weather(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<serde_json::Value>> {
    let (Some(lat), Some(lon)) = (query.lat, query.lon) else {
        return Err(AppError::InvalidRequest(
            "Error! 'lat' and 'lon' are required.".into(),
        ));
    };

    match state.weather.current(lat, lon).await {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            tracing::error!(error = %e, "weather provider call failed");
            Err(AppError::Upstream("Error while fetching the weather.".into()))
        }
    }
}

/// Plan a bike route for every profile. Profiles the provider could not
/// resolve are left out; the answer may be an empty array.
pub async fn plan_route(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    AppJson(req): AppJson<PlanRouteRequest>,
) -> Result<Json<Vec<FormattedRoute>>> {
    let (Some(start), Some(end)) = (req.start, req.end) else {
        return Err(AppError::InvalidRequest(
            "Error! 'start' and 'end' are required.".into(),
        ));
    };

    Ok(Json(state.planner.plan(start, end).await))
}
