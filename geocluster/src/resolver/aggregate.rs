//! Merging per-cell results into one response.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterResult;
use crate::coord::{BoundingBox, GridCell};

/// The tier that produced a cell's clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Memory cache hit.
    Cache,
    /// Persistent store hit.
    Store,
    /// Fresh engine computation.
    Engine,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Cache => "cache",
            Tier::Store => "store",
            Tier::Engine => "engine",
        })
    }
}

/// How one cell was resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CellResolution {
    pub cell: GridCell,
    pub tier: Tier,
    pub clusters: Vec<ClusterResult>,
}

/// Response body for a cluster query.
///
/// `count == clusters.len() == cached_count + stored_count + new_count`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResponse {
    pub count: usize,
    pub clusters: Vec<ClusterResult>,
    pub cached_count: usize,
    pub stored_count: usize,
    pub new_count: usize,
}

/// Concatenates cell results in cell order and attributes each cluster to a tier.
///
/// Cells are disjoint, so no deduplication is needed. With a clip box set,
/// clusters served from the cache or store whose centroid falls outside it
/// are dropped; fresh results are kept as computed.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    clip: Option<BoundingBox>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clip cached and stored results to `bbox`.
    pub fn clipped_to(bbox: BoundingBox) -> Self {
        Self { clip: Some(bbox) }
    }

    pub fn aggregate(&self, resolutions: Vec<CellResolution>) -> ClusterResponse {
        let mut response = ClusterResponse::default();

        for resolution in resolutions {
            let tier = resolution.tier;
            let kept: Vec<ClusterResult> = match (&self.clip, tier) {
                (Some(clip), Tier::Cache | Tier::Store) => resolution
                    .clusters
                    .into_iter()
                    .filter(|c| clip.contains(c.centroid_lon, c.centroid_lat))
                    .collect(),
                _ => resolution.clusters,
            };

            match tier {
                Tier::Cache => response.cached_count += kept.len(),
                Tier::Store => response.stored_count += kept.len(),
                Tier::Engine => response.new_count += kept.len(),
            }
            response.clusters.extend(kept);
        }

        response.count = response.clusters.len();
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution(x: i64, tier: Tier, centroids: &[(f64, f64)]) -> CellResolution {
        CellResolution {
            cell: GridCell::new(x, 0),
            tier,
            clusters: centroids
                .iter()
                .enumerate()
                .map(|(i, (lon, lat))| ClusterResult::new(format!("{x}-{i}"), *lon, *lat, 2))
                .collect(),
        }
    }

    #[test]
    fn test_counts_add_up() {
        let response = ResultAggregator::new().aggregate(vec![
            resolution(0, Tier::Cache, &[(0.01, 0.01), (0.02, 0.02)]),
            resolution(1, Tier::Store, &[(0.11, 0.01)]),
            resolution(2, Tier::Engine, &[(0.21, 0.01), (0.22, 0.01), (0.23, 0.01)]),
            resolution(3, Tier::Engine, &[]),
        ]);

        assert_eq!(response.count, 6);
        assert_eq!(response.count, response.clusters.len());
        assert_eq!(response.cached_count, 2);
        assert_eq!(response.stored_count, 1);
        assert_eq!(response.new_count, 3);
        assert_eq!(
            response.count,
            response.cached_count + response.stored_count + response.new_count
        );
    }

    #[test]
    fn test_preserves_cell_order() {
        let response = ResultAggregator::new().aggregate(vec![
            resolution(5, Tier::Engine, &[(0.0, 0.0)]),
            resolution(2, Tier::Cache, &[(0.0, 0.0)]),
        ]);

        let ids: Vec<&str> = response.clusters.iter().map(|c| c.cluster_id.as_str()).collect();
        assert_eq!(ids, vec!["5-0", "2-0"]);
    }

    #[test]
    fn test_clip_applies_to_cached_and_stored_only() {
        let clip = BoundingBox::new(0.0, 0.0, 0.05, 0.05).unwrap();
        let response = ResultAggregator::clipped_to(clip).aggregate(vec![
            resolution(0, Tier::Cache, &[(0.01, 0.01), (0.09, 0.09)]),
            resolution(1, Tier::Store, &[(0.08, 0.01)]),
            resolution(2, Tier::Engine, &[(0.09, 0.09)]),
        ]);

        assert_eq!(response.cached_count, 1);
        assert_eq!(response.stored_count, 0);
        assert_eq!(response.new_count, 1);
        assert_eq!(response.count, 2);
    }

    #[test]
    fn test_serialized_field_names() {
        let response = ResultAggregator::new().aggregate(vec![resolution(
            0,
            Tier::Engine,
            &[(22.94, 40.63)],
        )]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["count"], 1);
        assert_eq!(json["newCount"], 1);
        assert_eq!(json["cachedCount"], 0);
        assert_eq!(json["storedCount"], 0);
        assert_eq!(json["clusters"][0]["clusterId"], "0-0");
        assert_eq!(json["clusters"][0]["longitude"], 22.94);
        assert_eq!(json["clusters"][0]["pointCount"], 2);
    }
}
