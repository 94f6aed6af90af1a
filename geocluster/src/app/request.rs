//! Raw cluster query as received from a caller.

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterQueryParams;

/// Two arbitrary corner points plus optional clustering parameters.
///
/// Corners may come in any order and at any precision; the app normalizes
/// them before touching a tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    pub lon1: f64,
    pub lat1: f64,
    pub lon2: f64,
    pub lat2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
}

impl ClusterRequest {
    pub fn new(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Self {
        Self {
            lon1,
            lat1,
            lon2,
            lat2,
            eps: None,
            min_points: None,
            grid_size: None,
        }
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = Some(eps);
        self
    }

    pub fn with_min_points(mut self, min_points: u32) -> Self {
        self.min_points = Some(min_points);
        self
    }

    pub fn with_grid_size(mut self, grid_size: f64) -> Self {
        self.grid_size = Some(grid_size);
        self
    }

    /// Parameters with omitted values taken from `defaults`. Not validated.
    pub fn params_or(&self, defaults: &ClusterQueryParams) -> ClusterQueryParams {
        ClusterQueryParams {
            eps: self.eps.unwrap_or(defaults.eps),
            min_points: self.min_points.unwrap_or(defaults.min_points),
            grid_size: self.grid_size.unwrap_or(defaults.grid_size),
        }
    }
}
