//! DBSCAN over a small point set.
//!
//! Neighbour lookups use a uniform hash grid with `eps`-sized buckets, so
//! each query inspects at most the 3×3 buckets around a point.
//!
//! # Conventions
//!
//! - A point is a core point when its `eps`-neighbourhood (distance `<= eps`,
//!   the point itself included) holds at least `min_points` points.
//! - Points are visited in ascending id order; a border point reachable from
//!   two clusters joins the first one to reach it.
//! - A cluster is identified by the smallest id among its members, so ids are
//!   stable across calls and unique across disjoint rectangles.
//! - When the whole set holds `min_points` points or fewer, clustering is
//!   skipped and every point is returned as its own cluster.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::points::Point;
use crate::cluster::ClusterResult;

/// What to do with points that belong to no dense region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoisePolicy {
    /// Omit noise points from the result.
    #[default]
    Drop,
    /// Return each noise point as a single-point cluster.
    Singletons,
}

impl std::str::FromStr for NoisePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "singletons" => Ok(Self::Singletons),
            other => Err(format!("unknown noise policy '{other}' (expected drop or singletons)")),
        }
    }
}

const UNVISITED: usize = usize::MAX;
const NOISE: usize = usize::MAX - 1;

/// Clusters `points` and returns centroids ordered by descending size, then
/// ascending cluster id.
///
/// `points` must be sorted by id.
pub fn dbscan(points: &[Point], eps: f64, min_points: u32, noise: NoisePolicy) -> Vec<ClusterResult> {
    if points.is_empty() {
        return Vec::new();
    }
    if points.len() <= min_points as usize {
        return finish(points.iter().map(|p| vec![*p]).collect());
    }

    let grid = NeighbourGrid::new(points, eps);
    let mut labels = vec![UNVISITED; points.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for i in 0..points.len() {
        if labels[i] != UNVISITED {
            continue;
        }
        let neighbours = grid.neighbours(points, i);
        if neighbours.len() < min_points as usize {
            labels[i] = NOISE;
            continue;
        }

        let label = groups.len();
        let mut members = vec![i];
        labels[i] = label;
        let mut frontier = neighbours;

        while let Some(j) = frontier.pop() {
            if labels[j] == NOISE {
                // Border point
                labels[j] = label;
                members.push(j);
                continue;
            }
            if labels[j] != UNVISITED {
                continue;
            }
            labels[j] = label;
            members.push(j);

            let next = grid.neighbours(points, j);
            if next.len() >= min_points as usize {
                frontier.extend(next.into_iter().filter(|&k| {
                    labels[k] == UNVISITED || labels[k] == NOISE
                }));
            }
        }
        groups.push(members);
    }

    let mut clusters: Vec<Vec<Point>> = groups
        .into_iter()
        .map(|members| members.into_iter().map(|i| points[i]).collect())
        .collect();

    if noise == NoisePolicy::Singletons {
        clusters.extend(
            labels
                .iter()
                .zip(points)
                .filter(|(label, _)| **label == NOISE)
                .map(|(_, p)| vec![*p]),
        );
    }

    finish(clusters)
}

fn finish(groups: Vec<Vec<Point>>) -> Vec<ClusterResult> {
    let mut keyed: Vec<(i64, ClusterResult)> = groups
        .into_iter()
        .filter_map(|members| {
            let id = members.iter().map(|p| p.id).min()?;
            let n = members.len() as f64;
            let lon = members.iter().map(|p| p.lon).sum::<f64>() / n;
            let lat = members.iter().map(|p| p.lat).sum::<f64>() / n;
            Some((
                id,
                ClusterResult::new(id.to_string(), lon, lat, members.len() as u64),
            ))
        })
        .collect();

    keyed.sort_by(|(a_id, a), (b_id, b)| {
        b.point_count
            .cmp(&a.point_count)
            .then_with(|| a_id.cmp(b_id))
    });
    keyed.into_iter().map(|(_, c)| c).collect()
}

/// Hash grid with bucket edge `eps`.
struct NeighbourGrid {
    eps: f64,
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

impl NeighbourGrid {
    fn new(points: &[Point], eps: f64) -> Self {
        let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            buckets.entry(Self::bucket(p, eps)).or_default().push(i);
        }
        Self { eps, buckets }
    }

    /// Bucket coordinates. Tiny eps saturates at the `i64` bounds, which keeps
    /// neighbouring points in the same or adjacent buckets.
    fn bucket(p: &Point, eps: f64) -> (i64, i64) {
        ((p.lon / eps).floor() as i64, (p.lat / eps).floor() as i64)
    }

    /// Indices within `eps` of point `i`, including `i`.
    fn neighbours(&self, points: &[Point], i: usize) -> Vec<usize> {
        let p = &points[i];
        let (bx, by) = Self::bucket(p, self.eps);
        let eps_sq = self.eps * self.eps;
        let mut found = Vec::new();

        for dx in -1..=1 {
            for dy in -1..=1 {
                let (Some(x), Some(y)) = (bx.checked_add(dx), by.checked_add(dy)) else {
                    continue;
                };
                let Some(bucket) = self.buckets.get(&(x, y)) else {
                    continue;
                };
                for &j in bucket {
                    let q = &points[j];
                    let (dlon, dlat) = (q.lon - p.lon, q.lat - p.lat);
                    if dlon * dlon + dlat * dlat <= eps_sq {
                        found.push(j);
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(start_id: i64, lon: f64, lat: f64, n: usize, step: f64) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new(start_id + i as i64, lon + step * i as f64, lat))
            .collect()
    }

    #[test]
    fn test_small_sets_become_singletons() {
        let points = vec![Point::new(10, 1.0, 1.0), Point::new(11, 1.00001, 1.0)];
        let clusters = dbscan(&points, 0.001, 2, NoisePolicy::Drop);

        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.point_count == 1));
        assert_eq!(clusters[0].cluster_id, "10");
        assert_eq!(clusters[1].cluster_id, "11");
    }

    #[test]
    fn test_two_dense_groups_and_noise() {
        let mut points = line(1, 0.0, 0.0, 5, 0.0001);
        points.extend(line(100, 1.0, 1.0, 3, 0.0001));
        points.push(Point::new(500, 0.5, 0.5));

        let dropped = dbscan(&points, 0.00025, 2, NoisePolicy::Drop);
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped[0].point_count, 5);
        assert_eq!(dropped[0].cluster_id, "1");
        assert_eq!(dropped[1].point_count, 3);
        assert_eq!(dropped[1].cluster_id, "100");
        assert!((dropped[0].centroid_lon - 0.0002).abs() < 1e-12);

        let kept = dbscan(&points, 0.00025, 2, NoisePolicy::Singletons);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[2].cluster_id, "500");
    }

    #[test]
    fn test_chain_is_one_cluster() {
        // Consecutive points are within eps, the ends are not
        let points = line(1, 10.0, 10.0, 20, 0.0002);
        let clusters = dbscan(&points, 0.00025, 2, NoisePolicy::Drop);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].point_count, 20);
    }

    #[test]
    fn test_threshold_counts_the_point_itself() {
        // Three points; each middle neighbourhood holds exactly three
        let mut points = line(1, 0.0, 0.0, 3, 0.0002);
        points.push(Point::new(9, 5.0, 5.0));
        let clusters = dbscan(&points, 0.00025, 3, NoisePolicy::Drop);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].point_count, 3);
    }

    #[test]
    fn test_tiny_eps_groups_only_identical_points() {
        let points = vec![
            Point::new(1, 22.9, 40.6),
            Point::new(2, 22.9, 40.6),
            Point::new(3, 22.9, 40.6),
            Point::new(4, 22.91, 40.6),
            Point::new(5, -22.9, -40.6),
        ];
        let clusters = dbscan(&points, 1e-18, 2, NoisePolicy::Drop);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].point_count, 3);
    }

    #[test]
    fn test_noise_policy_parse() {
        assert_eq!("drop".parse::<NoisePolicy>().unwrap(), NoisePolicy::Drop);
        assert_eq!(
            " Singletons ".parse::<NoisePolicy>().unwrap(),
            NoisePolicy::Singletons
        );
        assert!("keep".parse::<NoisePolicy>().is_err());
    }

    proptest! {
        #[test]
        fn prop_every_point_accounted_for(
            coords in proptest::collection::vec((0.0f64..0.01, 0.0f64..0.01), 0..60),
            min_points in 2u32..5,
        ) {
            let points: Vec<Point> = coords
                .iter()
                .enumerate()
                .map(|(i, (lon, lat))| Point::new(i as i64, *lon, *lat))
                .collect();

            let clusters = dbscan(&points, 0.001, min_points, NoisePolicy::Singletons);
            let total: u64 = clusters.iter().map(|c| c.point_count).sum();
            prop_assert_eq!(total, points.len() as u64);

            for pair in clusters.windows(2) {
                prop_assert!(pair[0].point_count >= pair[1].point_count);
            }
        }
    }
}
