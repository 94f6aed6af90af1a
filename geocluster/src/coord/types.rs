//! Coordinate and grid types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude.
pub const MAX_LON: f64 = 180.0;

/// Minimum valid latitude.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude.
pub const MAX_LAT: f64 = 90.0;

/// Maximum number of decimal digits a coordinate may be rounded to.
///
/// Bounded so that grid-index snapping tolerance stays below the smallest
/// representable coordinate step.
pub const MAX_PRECISION: u32 = 8;

/// Smallest accepted grid cell edge, in degrees.
pub const MIN_GRID_SIZE: f64 = 1e-6;

/// Largest accepted grid cell edge, in degrees.
pub const MAX_GRID_SIZE: f64 = 360.0;

/// Errors produced while validating coordinates or tiling a region.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid longitude: {0} (must be finite and within [-180, 180])")]
    InvalidLongitude(f64),

    #[error("Invalid latitude: {0} (must be finite and within [-90, 90])")]
    InvalidLatitude(f64),

    #[error("Invalid grid size: {0} (must be finite and within [{MIN_GRID_SIZE}, {MAX_GRID_SIZE}])")]
    InvalidGridSize(f64),

    #[error("Invalid precision: {0} (max: {MAX_PRECISION})")]
    InvalidPrecision(u32),

    #[error("Bounding box is inverted: min ({min_lon}, {min_lat}) > max ({max_lon}, {max_lat})")]
    InvertedBounds {
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    },

    /// The region covers more grid cells than the configured maximum.
    #[error("Query too large: {cells} cells (max: {max})")]
    TooManyCells { cells: u64, max: u64 },
}

impl CoordError {
    /// Returns true if this error is a capacity rejection rather than malformed input.
    pub fn is_capacity(&self) -> bool {
        matches!(self, CoordError::TooManyCells { .. })
    }
}

/// Axis-aligned rectangle in (longitude, latitude) space.
///
/// Invariant: `min_lon <= max_lon` and `min_lat <= max_lat`. Constructed by
/// [`normalize`](super::normalize), [`BoundingBox::from_corners`] or
/// [`GridCell::bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Creates a bounding box from already-ordered edges.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, CoordError> {
        super::validate_lon(min_lon)?;
        super::validate_lon(max_lon)?;
        super::validate_lat(min_lat)?;
        super::validate_lat(max_lat)?;

        if min_lon > max_lon || min_lat > max_lat {
            return Err(CoordError::InvertedBounds {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            });
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Creates a bounding box from two opposite corners in any order, without rounding.
    pub fn from_corners(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Result<Self, CoordError> {
        Self::new(lon1.min(lon2), lat1.min(lat2), lon1.max(lon2), lat1.max(lat2))
    }

    /// Closed containment test (edges included).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]-[{}, {}]",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// A fixed-size grid cell identified by integer indices.
///
/// Cell `(x, y)` covers `[x·g, (x+1)·g) × [y·g, (y+1)·g)` for grid size `g`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i64,
    pub y: i64,
}

impl GridCell {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the rectangle this cell covers at the given grid size.
    ///
    /// Edges are products like `229.0 * 0.1`, which may sit an ulp away from
    /// the decimal edge, so the rectangle is only an approximation of the
    /// cell. Use [`GridCell::contains_point`] to decide membership. Cells on
    /// the antimeridian or poles may extend past the valid coordinate range.
    pub fn bounds(&self, grid_size: f64) -> BoundingBox {
        BoundingBox {
            min_lon: self.x as f64 * grid_size,
            min_lat: self.y as f64 * grid_size,
            max_lon: (self.x + 1) as f64 * grid_size,
            max_lat: (self.y + 1) as f64 * grid_size,
        }
    }

    /// Whether the point falls in this cell under [`cell_for`](super::cell_for).
    ///
    /// Adjacent cells never share a point, and a point on a multiple of the
    /// grid size belongs to the cell starting there.
    pub fn contains_point(&self, lon: f64, lat: f64, grid_size: f64) -> bool {
        matches!(super::cell_for(lon, lat, grid_size), Ok(cell) if cell == *self)
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min: GridCell,
    pub max: GridCell,
}

impl CellRange {
    /// Number of cells in the range, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        let cols = (self.max.x - self.min.x + 1) as u64;
        let rows = (self.max.y - self.min.y + 1) as u64;
        cols.saturating_mul(rows)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, cell: &GridCell) -> bool {
        (self.min.x..=self.max.x).contains(&cell.x) && (self.min.y..=self.max.y).contains(&cell.y)
    }

    /// Iterates cells in row-major order: latitude rows bottom to top,
    /// longitude columns left to right within a row.
    pub fn iter(&self) -> CellIter {
        CellIter {
            range: *self,
            next: Some(self.min),
        }
    }
}

impl IntoIterator for CellRange {
    type Item = GridCell;
    type IntoIter = CellIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Row-major iterator over a [`CellRange`].
#[derive(Debug, Clone)]
pub struct CellIter {
    range: CellRange,
    next: Option<GridCell>,
}

impl Iterator for CellIter {
    type Item = GridCell;

    fn next(&mut self) -> Option<GridCell> {
        let current = self.next?;

        self.next = if current.x < self.range.max.x {
            Some(GridCell::new(current.x + 1, current.y))
        } else if current.y < self.range.max.y {
            Some(GridCell::new(self.range.min.x, current.y + 1))
        } else {
            None
        };

        Some(current)
    }
}
