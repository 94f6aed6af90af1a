//! Bounding-box normalization and grid tiling.
//!
//! Queries arrive as two arbitrary corner points. Before anything touches a
//! cache they are canonicalized ([`normalize`]) so that requests differing only
//! in corner order or sub-precision jitter produce the same box, and then
//! partitioned into fixed-size grid cells ([`cells_overlapping`]) which are the
//! unit of caching, persistence and computation.

mod types;

pub use types::{
    BoundingBox, CellIter, CellRange, CoordError, GridCell, MAX_GRID_SIZE, MAX_LAT, MAX_LON,
    MAX_PRECISION, MIN_GRID_SIZE, MIN_LAT, MIN_LON,
};

/// Absolute tolerance used when snapping a grid quotient to an integer.
const SNAP_TOLERANCE: f64 = 1e-11;

pub(crate) fn validate_lon(lon: f64) -> Result<(), CoordError> {
    if lon.is_finite() && (MIN_LON..=MAX_LON).contains(&lon) {
        Ok(())
    } else {
        Err(CoordError::InvalidLongitude(lon))
    }
}

pub(crate) fn validate_lat(lat: f64) -> Result<(), CoordError> {
    if lat.is_finite() && (MIN_LAT..=MAX_LAT).contains(&lat) {
        Ok(())
    } else {
        Err(CoordError::InvalidLatitude(lat))
    }
}

/// Validates a grid cell edge length.
pub fn validate_grid_size(grid_size: f64) -> Result<(), CoordError> {
    if grid_size.is_finite() && (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid_size) {
        Ok(())
    } else {
        Err(CoordError::InvalidGridSize(grid_size))
    }
}

/// Rounds `value` to `precision` decimal digits.
#[inline]
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10_f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Canonicalizes two corner points into an ordered, rounded bounding box.
///
/// Each coordinate is rounded to `precision` decimal digits *before* the
/// min/max selection, so swapping the corners or adding jitter below the
/// precision yields an identical box.
///
/// # Errors
///
/// Returns a validation error if any input is non-finite or out of range, or
/// if `precision` exceeds [`MAX_PRECISION`].
pub fn normalize(
    lon1: f64,
    lat1: f64,
    lon2: f64,
    lat2: f64,
    precision: u32,
) -> Result<BoundingBox, CoordError> {
    validate_lon(lon1)?;
    validate_lat(lat1)?;
    validate_lon(lon2)?;
    validate_lat(lat2)?;
    if precision > MAX_PRECISION {
        return Err(CoordError::InvalidPrecision(precision));
    }

    let lon1 = round_to(lon1, precision);
    let lat1 = round_to(lat1, precision);
    let lon2 = round_to(lon2, precision);
    let lat2 = round_to(lat2, precision);

    Ok(BoundingBox {
        min_lon: lon1.min(lon2),
        min_lat: lat1.min(lat2),
        max_lon: lon1.max(lon2),
        max_lat: lat1.max(lat2),
    })
}

/// Floor-divides a coordinate by the grid size.
///
/// A value that is a multiple of the grid size in decimal terms (e.g. 22.9
/// with a 0.1 grid) can land a few ulps below the integer after binary
/// division; such quotients snap to the integer so the value belongs to the
/// cell starting there.
fn grid_index(value: f64, grid_size: f64) -> i64 {
    let quotient = value / grid_size;
    let nearest = quotient.round();
    let tolerance = SNAP_TOLERANCE.max(quotient.abs() * 4.0 * f64::EPSILON);

    if (quotient - nearest).abs() <= tolerance {
        nearest as i64
    } else {
        quotient.floor() as i64
    }
}

/// Returns the grid cell containing a point.
///
/// Cells are half-open: a point exactly on a multiple of `grid_size` belongs
/// to the cell starting at that multiple.
#[inline]
pub fn cell_for(lon: f64, lat: f64, grid_size: f64) -> Result<GridCell, CoordError> {
    validate_lon(lon)?;
    validate_lat(lat)?;
    validate_grid_size(grid_size)?;

    Ok(GridCell::new(
        grid_index(lon, grid_size),
        grid_index(lat, grid_size),
    ))
}

/// Returns the inclusive range of cells a bounding box overlaps.
///
/// Iterating the range yields cells in stable row-major order.
pub fn cells_overlapping(bbox: &BoundingBox, grid_size: f64) -> Result<CellRange, CoordError> {
    let min = cell_for(bbox.min_lon, bbox.min_lat, grid_size)?;
    let max = cell_for(bbox.max_lon, bbox.max_lat, grid_size)?;
    Ok(CellRange { min, max })
}

/// Like [`cells_overlapping`], but rejects ranges larger than `max_cells`.
///
/// # Errors
///
/// Returns [`CoordError::TooManyCells`] when the range exceeds the limit.
pub fn cells_within_budget(
    bbox: &BoundingBox,
    grid_size: f64,
    max_cells: u64,
) -> Result<CellRange, CoordError> {
    let range = cells_overlapping(bbox, grid_size)?;
    let cells = range.len();
    if cells > max_cells {
        return Err(CoordError::TooManyCells {
            cells,
            max: max_cells,
        });
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_orders_corners() {
        let bbox = normalize(22.95, 40.65, 22.90, 40.60, 4).unwrap();
        assert_eq!(bbox.min_lon, 22.90);
        assert_eq!(bbox.min_lat, 40.60);
        assert_eq!(bbox.max_lon, 22.95);
        assert_eq!(bbox.max_lat, 40.65);
    }

    #[test]
    fn test_normalize_absorbs_sub_precision_jitter() {
        let a = normalize(22.90001, 40.60002, 22.95, 40.65, 4).unwrap();
        let b = normalize(22.89999, 40.59998, 22.95, 40.65, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalize_rounds_before_ordering() {
        // Raw lon1 < lon2, but both round to the same value.
        let bbox = normalize(10.00004, 0.0, 10.00001, 1.0, 4).unwrap();
        assert_eq!(bbox.min_lon, 10.0);
        assert_eq!(bbox.max_lon, 10.0);
    }

    #[test]
    fn test_normalize_rejects_out_of_range() {
        assert_eq!(
            normalize(200.0, 40.0, 22.0, 40.0, 4),
            Err(CoordError::InvalidLongitude(200.0))
        );
        assert_eq!(
            normalize(22.0, 40.0, 22.0, -91.0, 4),
            Err(CoordError::InvalidLatitude(-91.0))
        );
    }

    #[test]
    fn test_normalize_rejects_non_finite() {
        assert!(normalize(f64::NAN, 0.0, 1.0, 1.0, 4).is_err());
        assert!(normalize(0.0, f64::INFINITY, 1.0, 1.0, 4).is_err());
    }

    #[test]
    fn test_normalize_rejects_excess_precision() {
        assert_eq!(
            normalize(0.0, 0.0, 1.0, 1.0, MAX_PRECISION + 1),
            Err(CoordError::InvalidPrecision(MAX_PRECISION + 1))
        );
    }

    #[test]
    fn test_cell_for_boundary_point_belongs_to_upper_cell() {
        let cell = cell_for(0.1, 0.1, 0.1).unwrap();
        assert_eq!(cell, GridCell::new(1, 1));
    }

    #[test]
    fn test_cell_for_negative_coordinates_floor() {
        let cell = cell_for(-0.05, -0.15, 0.1).unwrap();
        assert_eq!(cell, GridCell::new(-1, -2));
    }

    #[test]
    fn test_cell_for_decimal_multiple_snaps() {
        // 22.9 / 0.1 evaluates to 228.99999999999997 in binary floating point.
        let cell = cell_for(22.9, 40.6, 0.1).unwrap();
        assert_eq!(cell, GridCell::new(229, 406));
    }

    #[test]
    fn test_cell_for_rejects_bad_grid_size() {
        assert!(matches!(
            cell_for(0.0, 0.0, 0.0),
            Err(CoordError::InvalidGridSize(_))
        ));
        assert!(matches!(
            cell_for(0.0, 0.0, -0.1),
            Err(CoordError::InvalidGridSize(_))
        ));
    }

    #[test]
    fn test_thessaloniki_single_cell() {
        let bbox = normalize(22.90, 40.60, 22.95, 40.65, 4).unwrap();
        let range = cells_overlapping(&bbox, 0.1).unwrap();
        let cells: Vec<_> = range.iter().collect();
        assert_eq!(cells, vec![GridCell::new(229, 406)]);

        let bounds = cells[0].bounds(0.1);
        assert!((bounds.min_lon - 22.9).abs() < 1e-9);
        assert!((bounds.max_lon - 23.0).abs() < 1e-9);
        assert!((bounds.min_lat - 40.6).abs() < 1e-9);
        assert!((bounds.max_lat - 40.7).abs() < 1e-9);
    }

    #[test]
    fn test_cells_overlapping_spans_multiple_rows() {
        let bbox = normalize(0.05, 0.05, 0.25, 0.15, 4).unwrap();
        let cells: Vec<_> = cells_overlapping(&bbox, 0.1).unwrap().iter().collect();
        assert_eq!(
            cells,
            vec![
                GridCell::new(0, 0),
                GridCell::new(1, 0),
                GridCell::new(2, 0),
                GridCell::new(0, 1),
                GridCell::new(1, 1),
                GridCell::new(2, 1),
            ]
        );
    }

    #[test]
    fn test_cells_within_budget_rejects_oversized_query() {
        // 1000 × 1000 cells at a 0.01 grid.
        let bbox = normalize(0.0, 0.0, 9.995, 9.995, 4).unwrap();
        let result = cells_within_budget(&bbox, 0.01, 10_000);
        assert_eq!(
            result,
            Err(CoordError::TooManyCells {
                cells: 1_000_000,
                max: 10_000
            })
        );
    }

    #[test]
    fn test_cells_within_budget_accepts_exact_limit() {
        let bbox = normalize(0.0, 0.0, 0.095, 0.095, 4).unwrap();
        let range = cells_within_budget(&bbox, 0.01, 100).unwrap();
        assert_eq!(range.len(), 100);
    }

    proptest! {
        #[test]
        fn prop_normalize_swap_invariant(
            lon1 in -180.0f64..=180.0,
            lat1 in -90.0f64..=90.0,
            lon2 in -180.0f64..=180.0,
            lat2 in -90.0f64..=90.0,
            precision in 0u32..=MAX_PRECISION,
        ) {
            let a = normalize(lon1, lat1, lon2, lat2, precision).unwrap();
            let b = normalize(lon2, lat2, lon1, lat1, precision).unwrap();
            prop_assert_eq!(a, b);
            prop_assert!(a.min_lon <= a.max_lon);
            prop_assert!(a.min_lat <= a.max_lat);
        }

        #[test]
        fn prop_points_in_bbox_map_to_overlapping_cells(
            lon1 in -179.0f64..179.0,
            lat1 in -89.0f64..89.0,
            width in 0.0f64..1.0,
            height in 0.0f64..1.0,
            fx in 0.0f64..=1.0,
            fy in 0.0f64..=1.0,
            grid_size in prop::sample::select(vec![0.001, 0.01, 0.05, 0.1, 0.25, 1.0]),
        ) {
            let bbox = normalize(lon1, lat1, lon1 + width, lat1 + height, 4).unwrap();
            let lon = bbox.min_lon + bbox.width() * fx;
            let lat = bbox.min_lat + bbox.height() * fy;
            prop_assume!(bbox.contains(lon, lat));

            let range = cells_overlapping(&bbox, grid_size).unwrap();
            let cell = cell_for(lon, lat, grid_size).unwrap();
            prop_assert!(range.contains(&cell));
        }

        #[test]
        fn prop_cell_enumeration_is_stable(
            lon1 in -10.0f64..10.0,
            lat1 in -10.0f64..10.0,
            width in 0.0f64..0.5,
            height in 0.0f64..0.5,
        ) {
            let bbox = normalize(lon1, lat1, lon1 + width, lat1 + height, 4).unwrap();
            let first: Vec<_> = cells_overlapping(&bbox, 0.1).unwrap().iter().collect();
            let second: Vec<_> = cells_overlapping(&bbox, 0.1).unwrap().iter().collect();
            prop_assert_eq!(first.len() as u64, cells_overlapping(&bbox, 0.1).unwrap().len());
            prop_assert_eq!(first, second);
        }
    }
}
