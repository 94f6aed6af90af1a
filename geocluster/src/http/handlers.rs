//! Route handlers.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::app::{AppStats, ClusterRequest};
use crate::resolver::ClusterResponse;

/// `GET /clusters?lon1&lat1&lon2&lat2&eps?&minPoints?&gridSize?`
pub async fn clusters(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ClusterResponse>, ApiError> {
    let request = parse_request(&query)?;
    let response = state.app.query(&request).await?;
    Ok(Json(response))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> Json<AppStats> {
    Json(state.app.stats())
}

/// Builds a request from raw query parameters.
///
/// Range checks happen later, during normalization; this only checks
/// presence and syntax.
pub fn parse_request(query: &HashMap<String, String>) -> Result<ClusterRequest, ApiError> {
    Ok(ClusterRequest {
        lon1: required(query, "lon1")?,
        lat1: required(query, "lat1")?,
        lon2: required(query, "lon2")?,
        lat2: required(query, "lat2")?,
        eps: optional(query, "eps")?,
        min_points: optional(query, "minPoints")?,
        grid_size: optional(query, "gridSize")?,
    })
}

fn required<T: FromStr>(query: &HashMap<String, String>, name: &str) -> Result<T, ApiError> {
    optional(query, name)?
        .ok_or_else(|| ApiError::bad_request(format!("Missing required parameter '{name}'")))
}

fn optional<T: FromStr>(
    query: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, ApiError> {
    match query.get(name).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            ApiError::bad_request(format!("Invalid value for '{name}': '{raw}'"))
        }),
    }
}
