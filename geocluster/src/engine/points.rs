//! Point set loading and rectangle selection.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::EngineError;
use crate::coord::{GridCell, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Scan margin around a cell rectangle, as a fraction of the grid size.
///
/// Must exceed the tiler's snapping tolerance.
const EDGE_MARGIN: f64 = 1e-6;

/// A single point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(id: i64, lon: f64, lat: f64) -> Self {
        Self { id, lon, lat }
    }

    fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (MIN_LON..=MAX_LON).contains(&self.lon)
            && (MIN_LAT..=MAX_LAT).contains(&self.lat)
    }
}

/// Immutable point set sorted by longitude for range selection.
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    /// Builds a point set, rejecting invalid coordinates.
    pub fn new(mut points: Vec<Point>) -> Result<Self, EngineError> {
        if let Some(bad) = points.iter().find(|p| !p.is_valid()) {
            return Err(EngineError::InvalidPoint {
                id: bad.id,
                lon: bad.lon,
                lat: bad.lat,
            });
        }
        points.sort_by(|a, b| a.lon.total_cmp(&b.lon).then(a.id.cmp(&b.id)));
        Ok(Self { points })
    }

    /// Loads a JSON array of `{"id", "lon", "lat"}` objects.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let points: Vec<Point> = serde_json::from_slice(&bytes)?;
        let set = Self::new(points)?;
        info!(path = %path.display(), points = set.len(), "Point set loaded");
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points that [`cell_for`](crate::coord::cell_for) places in `cell`,
    /// ordered by id.
    ///
    /// The lon range scanned is the cell rectangle widened by a small margin;
    /// membership itself is decided by the grid rule, so a point on a decimal
    /// edge such as 22.9 lands in the same cell the tiler assigns it.
    pub fn within_cell(&self, cell: GridCell, grid_size: f64) -> Vec<Point> {
        let rect = cell.bounds(grid_size);
        let margin = grid_size * EDGE_MARGIN;
        let start = self.points.partition_point(|p| p.lon < rect.min_lon - margin);
        let end = self.points.partition_point(|p| p.lon < rect.max_lon + margin);

        let mut selected: Vec<Point> = self.points[start..end]
            .iter()
            .filter(|p| cell.contains_point(p.lon, p.lat, grid_size))
            .copied()
            .collect();
        selected.sort_by_key(|p| p.id);
        selected
    }
}
