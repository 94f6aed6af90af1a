//! Cluster data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{self, CoordError, GridCell};

/// Smallest accepted density threshold.
pub const MIN_POINTS_FLOOR: u32 = 2;

/// Errors produced while validating clustering parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("Invalid eps: {0} (must be finite and positive)")]
    InvalidEps(f64),

    #[error("Invalid minPoints: {0} (must be at least {MIN_POINTS_FLOOR})")]
    InvalidMinPoints(u32),

    #[error(transparent)]
    Grid(#[from] CoordError),
}

/// Density clustering parameters plus the tiling grid size.
///
/// All three fields participate in every cache and store key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterQueryParams {
    /// Neighbourhood radius, in degrees.
    pub eps: f64,
    /// Minimum neighbourhood size (including the point itself) for a core point.
    pub min_points: u32,
    /// Grid cell edge length, in degrees.
    pub grid_size: f64,
}

impl ClusterQueryParams {
    /// Creates validated parameters.
    pub fn new(eps: f64, min_points: u32, grid_size: f64) -> Result<Self, ParamsError> {
        let params = Self {
            eps,
            min_points,
            grid_size,
        };
        params.validate()?;
        Ok(params)
    }

    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(ParamsError::InvalidEps(self.eps));
        }
        if self.min_points < MIN_POINTS_FLOOR {
            return Err(ParamsError::InvalidMinPoints(self.min_points));
        }
        coord::validate_grid_size(self.grid_size)?;
        Ok(())
    }
}

/// One cluster produced by the engine.
///
/// Immutable once computed. Serialized field names match the HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResult {
    pub cluster_id: String,
    #[serde(rename = "longitude")]
    pub centroid_lon: f64,
    #[serde(rename = "latitude")]
    pub centroid_lat: f64,
    pub point_count: u64,
}

impl ClusterResult {
    pub fn new(
        cluster_id: impl Into<String>,
        centroid_lon: f64,
        centroid_lat: f64,
        point_count: u64,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            centroid_lon,
            centroid_lat,
            point_count,
        }
    }
}

/// Deterministic identity of one cell's cluster set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellKey {
    pub cell: GridCell,
    pub params: ClusterQueryParams,
}

impl CellKey {
    pub fn new(cell: GridCell, params: ClusterQueryParams) -> Self {
        Self { cell, params }
    }

    /// String form used by the memory cache, the store index and the coalescer.
    ///
    /// Format: `clusters:{cellX}:{cellY}:g{gridSize}:e{eps}:m{minPoints}`.
    /// Floats use Rust's shortest round-trip formatting, which is stable.
    pub fn to_key(&self) -> String {
        format!(
            "clusters:{}:{}:g{}:e{}:m{}",
            self.cell.x, self.cell.y, self.params.grid_size, self.params.eps, self.params.min_points
        )
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

/// A cluster set persisted for one cell and parameter combination.
///
/// Append-only: records are never updated or deleted by the query flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedClusterRecord {
    pub cell: GridCell,
    pub params: ClusterQueryParams,
    pub clusters: Vec<ClusterResult>,
    pub created_at: DateTime<Utc>,
}

impl PersistedClusterRecord {
    /// Creates a record stamped with the current time.
    pub fn new(key: CellKey, clusters: Vec<ClusterResult>) -> Self {
        Self {
            cell: key.cell,
            params: key.params,
            clusters,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.cell, self.params)
    }
}
