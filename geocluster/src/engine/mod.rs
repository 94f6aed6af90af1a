//! Density clustering engine.
//!
//! The orchestrator treats the engine as a pure function of
//! (points inside a cell rectangle, eps, minPoints). [`ClusteringEngine`] is
//! that seam; [`PointSetEngine`] implements it in-process over a point set
//! loaded from a JSON file.
//!
//! # Cell Semantics
//!
//! The engine is handed the grid cell and grid size rather than a float
//! rectangle. The rectangle `[x·g, (x+1)·g) × [y·g, (y+1)·g)` is
//! [`GridCell::bounds`], but a product such as `229.0 * 0.1` rounds to
//! `22.900000000000002`, so point membership follows
//! [`cell_for`](crate::coord::cell_for) instead. A point on a cell boundary is
//! therefore clustered exactly once, in the cell the tiler assigns it.

mod dbscan;
mod points;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::cache::BoxFuture;
use crate::cluster::ClusterResult;
use crate::coord::GridCell;

pub use dbscan::{dbscan, NoisePolicy};
pub use points::{Point, PointSet};

/// Errors from a clustering engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The point file could not be read.
    #[error("Failed to read point set: {0}")]
    Io(#[from] std::io::Error),

    /// The point file is not a valid JSON point list.
    #[error("Failed to parse point set: {0}")]
    Parse(#[from] serde_json::Error),

    /// A point has out-of-range or non-finite coordinates.
    #[error("Invalid point {id}: ({lon}, {lat})")]
    InvalidPoint { id: i64, lon: f64, lat: f64 },

    /// The clustering task panicked or was cancelled.
    #[error("Clustering task failed: {0}")]
    Task(String),

    /// Backend-specific failure.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

/// Computes clusters for one grid cell.
///
/// Implementations must return results ordered by descending point count and
/// must be deterministic for identical inputs.
pub trait ClusteringEngine: Send + Sync {
    fn cluster(
        &self,
        cell: GridCell,
        grid_size: f64,
        eps: f64,
        min_points: u32,
    ) -> BoxFuture<'_, Result<Vec<ClusterResult>, EngineError>>;
}

/// In-process DBSCAN engine over a shared point set.
pub struct PointSetEngine {
    points: Arc<PointSet>,
    noise: NoisePolicy,
}

impl PointSetEngine {
    pub fn new(points: PointSet, noise: NoisePolicy) -> Self {
        Self {
            points: Arc::new(points),
            noise,
        }
    }

    /// Number of points available to the engine.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

impl ClusteringEngine for PointSetEngine {
    fn cluster(
        &self,
        cell: GridCell,
        grid_size: f64,
        eps: f64,
        min_points: u32,
    ) -> BoxFuture<'_, Result<Vec<ClusterResult>, EngineError>> {
        let points = Arc::clone(&self.points);
        let noise = self.noise;

        Box::pin(async move {
            let clusters = tokio::task::spawn_blocking(move || {
                let selected = points.within_cell(cell, grid_size);
                let selected_count = selected.len();
                let clusters = dbscan(&selected, eps, min_points, noise);
                debug!(
                    cell = %cell,
                    grid_size,
                    points = selected_count,
                    clusters = clusters.len(),
                    "Clustered cell"
                );
                clusters
            })
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;

            Ok(clusters)
        })
    }
}
