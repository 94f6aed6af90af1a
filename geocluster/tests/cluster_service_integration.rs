//! Integration tests for the three-tier cluster resolution flow.
//!
//! These tests drive `ClusterApp` end to end with counting collaborators:
//! - Cold, warm and restarted tiers (engine → store → memory cache)
//! - Parameter isolation and request canonicalization
//! - Capacity rejection before any tier is touched
//! - Failure propagation with earlier writes kept
//! - Request coalescing, pool exhaustion and the request deadline
//! - Tile-local DBSCAN over a real point set
//!
//! Run with: `cargo test --test cluster_service_integration`

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use geocluster::app::{AppConfig, ClusterRequest};
use geocluster::cluster::ClusterQueryParams;
use geocluster::engine::{NoisePolicy, Point, PointSet, PointSetEngine};
use geocluster::resolver::{ClusterResponse, ResolveError, ResolverConfig, TimeoutTier};
use geocluster::store::{ClusterStore, MemoryClusterStore};

use common::{start_app, CountingEngine, CountingStore};

// ============================================================================
// Helper Functions
// ============================================================================

const EPS: f64 = 0.00025;
const MIN_POINTS: u32 = 2;
const GRID: f64 = 0.1;

/// Config with 0.1° cells and the stock DBSCAN defaults.
fn config() -> AppConfig {
    AppConfig::default().with_defaults(ClusterQueryParams {
        eps: EPS,
        min_points: MIN_POINTS,
        grid_size: GRID,
    })
}

/// Config resolving one cell at a time, so failures have a fixed position.
fn sequential_config() -> AppConfig {
    config().with_resolver(ResolverConfig::default().with_cell_concurrency(1))
}

/// A box inside the single Thessaloniki cell (229, 406) at 0.1° grid.
fn thessaloniki() -> ClusterRequest {
    ClusterRequest::new(22.90, 40.60, 22.95, 40.65)
}

/// A thin strip across cells x = 229, 230, 231 on row y = 406.
fn three_cell_strip() -> ClusterRequest {
    ClusterRequest::new(22.95, 40.65, 23.15, 40.66)
}

fn assert_counts_consistent(response: &ClusterResponse) {
    assert_eq!(response.count, response.clusters.len());
    assert_eq!(
        response.count,
        response.cached_count + response.stored_count + response.new_count
    );
}

// ============================================================================
// Tier Flow
// ============================================================================

/// First query computes, second is served entirely from memory.
#[tokio::test]
async fn test_cold_then_warm_is_fully_cached() {
    let store = Arc::new(CountingStore::new());
    let engine = Arc::new(CountingEngine::new());
    let app = start_app(config(), store.clone(), engine.clone()).await;

    let first = app.query(&thessaloniki()).await.unwrap();
    assert_eq!(first.count, 1);
    assert_eq!(first.new_count, 1);
    assert_eq!(engine.calls(), 1);
    assert_eq!(store.inserts(), 1);

    let second = app.query(&thessaloniki()).await.unwrap();
    assert_eq!(second.clusters, first.clusters);
    assert_eq!(second.cached_count, second.count);
    assert_eq!(second.new_count, 0);
    assert_eq!(engine.calls(), 1, "warm query must not reach the engine");
    assert_eq!(store.queries(), 1, "warm query must not reach the store");

    assert_counts_consistent(&first);
    assert_counts_consistent(&second);
    app.shutdown().await;
}

/// A restarted service with an empty memory cache answers from the store.
#[tokio::test]
async fn test_store_serves_after_restart() {
    let store = Arc::new(CountingStore::new());

    let first_engine = Arc::new(CountingEngine::new());
    let app = start_app(config(), store.clone(), first_engine.clone()).await;
    let computed = app.query(&thessaloniki()).await.unwrap();
    app.shutdown().await;

    let second_engine = Arc::new(CountingEngine::new());
    let app = start_app(config(), store.clone(), second_engine.clone()).await;
    let restored = app.query(&thessaloniki()).await.unwrap();

    assert_eq!(restored.clusters, computed.clusters);
    assert_eq!(restored.stored_count, restored.count);
    assert_eq!(second_engine.calls(), 0);
    assert_eq!(store.record_count(), 1, "store hits must not append records");

    // The store hit warmed the new cache
    let warm = app.query(&thessaloniki()).await.unwrap();
    assert_eq!(warm.cached_count, warm.count);
    app.shutdown().await;
}

/// Different parameters never share cached or stored entries.
#[tokio::test]
async fn test_parameters_are_isolated() {
    let store = Arc::new(CountingStore::new());
    let engine = Arc::new(CountingEngine::new());
    let app = start_app(config(), store.clone(), engine.clone()).await;

    app.query(&thessaloniki()).await.unwrap();
    let other_eps = app.query(&thessaloniki().with_eps(0.0005)).await.unwrap();
    let other_min = app.query(&thessaloniki().with_min_points(5)).await.unwrap();

    assert_eq!(other_eps.new_count, 1);
    assert_eq!(other_min.new_count, 1);
    assert_eq!(engine.calls(), 3);
    assert_eq!(store.record_count(), 3);
    app.shutdown().await;
}

/// Swapped corners and sub-precision jitter resolve to the same cached cells.
#[tokio::test]
async fn test_equivalent_requests_share_cache() {
    let engine = Arc::new(CountingEngine::new());
    let app = start_app(config(), Arc::new(MemoryClusterStore::new()), engine.clone()).await;

    app.query(&thessaloniki()).await.unwrap();
    let swapped = app
        .query(&ClusterRequest::new(22.95, 40.65, 22.90, 40.60))
        .await
        .unwrap();
    let jittered = app
        .query(&ClusterRequest::new(22.900001, 40.600002, 22.949999, 40.65))
        .await
        .unwrap();

    assert_eq!(swapped.cached_count, swapped.count);
    assert_eq!(jittered.cached_count, jittered.count);
    assert_eq!(engine.calls(), 1);
    app.shutdown().await;
}

/// Partially warm queries attribute every cluster to exactly one tier.
#[tokio::test]
async fn test_mixed_tiers_keep_counts_consistent() {
    let engine = Arc::new(CountingEngine::new());
    let app = start_app(config(), Arc::new(MemoryClusterStore::new()), engine.clone()).await;

    app.query(&ClusterRequest::new(22.95, 40.65, 22.96, 40.66))
        .await
        .unwrap();
    let response = app.query(&three_cell_strip()).await.unwrap();

    assert_eq!(response.count, 3);
    assert_eq!(response.cached_count, 1);
    assert_eq!(response.new_count, 2);
    assert_counts_consistent(&response);
    assert_eq!(engine.calls(), 3);
    app.shutdown().await;
}

// ============================================================================
// Rejection and Failure
// ============================================================================

/// 1000 × 1000 cells exceeds the budget and nothing is touched.
#[tokio::test]
async fn test_oversized_query_touches_no_tier() {
    let store = Arc::new(CountingStore::new());
    let engine = Arc::new(CountingEngine::new());
    let app = start_app(config(), store.clone(), engine.clone()).await;

    let request = ClusterRequest::new(0.0, 0.0, 9.995, 9.995).with_grid_size(0.01);
    let err = app.query(&request).await.unwrap_err();

    match err {
        ResolveError::QueryTooLarge { cells, max } => {
            assert_eq!(cells, 1_000_000);
            assert_eq!(max, 10_000);
        }
        other => panic!("expected QueryTooLarge, got {other:?}"),
    }
    assert_eq!(engine.calls(), 0);
    assert_eq!(store.queries(), 0);
    assert_eq!(app.stats().cache_entries, 0);
    assert_eq!(app.stats().telemetry.requests_rejected, 1);
    app.shutdown().await;
}

#[tokio::test]
async fn test_invalid_coordinates_are_rejected() {
    let engine = Arc::new(CountingEngine::new());
    let app = start_app(config(), Arc::new(MemoryClusterStore::new()), engine.clone()).await;

    let err = app
        .query(&ClusterRequest::new(181.0, 0.0, 182.0, 1.0))
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Validation(_)));
    assert!(err.is_client_error());
    assert_eq!(engine.calls(), 0);
    app.shutdown().await;
}

/// An engine failure aborts the call; cells finished before it stay persisted.
#[tokio::test]
async fn test_engine_failure_keeps_earlier_writes() {
    let store = Arc::new(CountingStore::new());
    let engine = Arc::new(CountingEngine::new().failing_on(2));
    let app = start_app(sequential_config(), store.clone(), engine.clone()).await;

    let err = app.query(&three_cell_strip()).await.unwrap_err();
    assert!(matches!(err, ResolveError::Engine(_)), "got {err:?}");
    assert!(!err.is_client_error());
    assert_eq!(store.record_count(), 1);
    assert_eq!(app.stats().telemetry.requests_failed, 1);

    // Retrying picks up the finished cell and computes the rest
    let retried = app.query(&three_cell_strip()).await.unwrap();
    assert_eq!(retried.count, 3);
    assert_eq!(retried.cached_count, 1);
    assert_eq!(retried.new_count, 2);
    assert_eq!(store.record_count(), 3);
    app.shutdown().await;
}

#[tokio::test]
async fn test_store_failure_aborts_call() {
    let store = Arc::new(CountingStore::new().failing_inserts_after(1));
    let engine = Arc::new(CountingEngine::new());
    let app = start_app(sequential_config(), store.clone(), engine.clone()).await;

    let err = app.query(&three_cell_strip()).await.unwrap_err();

    assert!(matches!(err, ResolveError::Store(_)), "got {err:?}");
    assert_eq!(store.record_count(), 1);
    assert_eq!(engine.calls(), 2, "third cell is never reached");
    app.shutdown().await;
}

// ============================================================================
// Concurrency
// ============================================================================

/// Concurrent identical queries share one computation per cell.
#[tokio::test]
async fn test_concurrent_queries_coalesce() {
    let store = Arc::new(CountingStore::new());
    let engine = Arc::new(CountingEngine::new().with_delay(Duration::from_millis(200)));
    let app = start_app(config(), store.clone(), engine.clone()).await;

    let request = thessaloniki();
    let (a, b) = tokio::join!(app.query(&request), app.query(&request));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(engine.calls(), 1);
    assert_eq!(store.record_count(), 1);
    assert_eq!(a.clusters, b.clusters);
    assert_eq!(app.stats().telemetry.cells_coalesced, 1);
    app.shutdown().await;
}

/// With one connection and a slow engine, the second distinct cell gives up.
#[tokio::test]
async fn test_pool_exhaustion_is_reported() {
    let engine = Arc::new(CountingEngine::new().with_delay(Duration::from_millis(500)));
    let config = config().with_pool(1, Duration::from_millis(50));
    let app = start_app(config, Arc::new(MemoryClusterStore::new()), engine.clone()).await;

    let west = thessaloniki();
    let east = ClusterRequest::new(23.05, 40.65, 23.06, 40.66);
    let (a, b) = tokio::join!(app.query(&west), app.query(&east));

    let results = [a, b];
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(ResolveError::PoolExhausted { .. })))
        .count();
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(exhausted, 1);
    assert_eq!(succeeded, 1);
    app.shutdown().await;
}

#[tokio::test]
async fn test_request_deadline() {
    let engine = Arc::new(CountingEngine::new().with_delay(Duration::from_millis(500)));
    let config = config().with_request_timeout(Duration::from_millis(50));
    let app = start_app(config, Arc::new(MemoryClusterStore::new()), engine).await;

    let err = app.query(&thessaloniki()).await.unwrap_err();

    assert!(
        matches!(
            err,
            ResolveError::Timeout {
                tier: TimeoutTier::Request,
                ..
            }
        ),
        "got {err:?}"
    );
    app.shutdown().await;
}

// ============================================================================
// Real Point Set
// ============================================================================

fn point_engine(points: Vec<Point>) -> Arc<PointSetEngine> {
    Arc::new(PointSetEngine::new(
        PointSet::new(points).unwrap(),
        NoisePolicy::Drop,
    ))
}

/// Three close points form one cluster; the outlier is noise.
#[tokio::test]
async fn test_dbscan_over_thessaloniki_cell() {
    let engine = point_engine(vec![
        Point::new(1, 22.9500, 40.6500),
        Point::new(2, 22.9501, 40.6501),
        Point::new(3, 22.9502, 40.6500),
        Point::new(4, 22.9300, 40.6300),
    ]);
    let app = start_app(config(), Arc::new(MemoryClusterStore::new()), engine).await;

    let response = app.query(&thessaloniki()).await.unwrap();

    assert_eq!(response.count, 1);
    let cluster = &response.clusters[0];
    assert_eq!(cluster.cluster_id, "1");
    assert_eq!(cluster.point_count, 3);
    assert!((cluster.centroid_lon - 22.9501).abs() < 1e-9);
    assert!((cluster.centroid_lat - 40.650033333).abs() < 1e-6);
    app.shutdown().await;
}

/// Points exactly on the cell's decimal west and south edges are clustered
/// with the cell the tiler assigns them.
#[tokio::test]
async fn test_points_on_decimal_cell_edge_are_included() {
    let engine = point_engine(vec![
        Point::new(1, 22.9, 40.6),
        Point::new(2, 22.9, 40.6001),
        Point::new(3, 22.9001, 40.6),
    ]);
    let app = start_app(config(), Arc::new(MemoryClusterStore::new()), engine).await;

    let response = app.query(&thessaloniki()).await.unwrap();

    assert_eq!(response.count, 1);
    assert_eq!(response.clusters[0].cluster_id, "1");
    assert_eq!(response.clusters[0].point_count, 3);
    app.shutdown().await;
}

/// Points either side of a cell edge cluster separately, per cell.
#[tokio::test]
async fn test_clusters_do_not_cross_cell_edges() {
    let engine = point_engine(vec![
        Point::new(10, 22.99980, 40.65),
        Point::new(11, 22.99990, 40.65),
        Point::new(12, 22.99998, 40.65),
        Point::new(20, 23.00002, 40.65),
        Point::new(21, 23.00010, 40.65),
        Point::new(22, 23.00020, 40.65),
    ]);
    let app = start_app(config(), Arc::new(MemoryClusterStore::new()), engine).await;

    let response = app
        .query(&ClusterRequest::new(22.95, 40.62, 23.05, 40.68))
        .await
        .unwrap();

    let ids: HashSet<_> = response
        .clusters
        .iter()
        .map(|c| c.cluster_id.as_str())
        .collect();
    assert_eq!(ids, HashSet::from(["10", "20"]));
    assert!(response.clusters.iter().all(|c| c.point_count == 3));
    assert_counts_consistent(&response);
    app.shutdown().await;
}

/// With clipping on, cached clusters outside the request box are dropped.
#[tokio::test]
async fn test_clip_to_request_filters_cached_clusters() {
    let points = vec![
        Point::new(1, 22.9900, 40.6900),
        Point::new(2, 22.9901, 40.6901),
        Point::new(3, 22.9902, 40.6900),
    ];
    let clipped_config =
        config().with_resolver(ResolverConfig::default().with_clip_to_request(true));
    let app = start_app(
        clipped_config,
        Arc::new(MemoryClusterStore::new()),
        point_engine(points),
    )
    .await;

    // Fresh results are returned as computed
    let fresh = app.query(&thessaloniki()).await.unwrap();
    assert_eq!(fresh.new_count, 1);

    // Cached results outside the request box are dropped
    let cached = app.query(&thessaloniki()).await.unwrap();
    assert_eq!(cached.count, 0);
    assert_counts_consistent(&cached);
    app.shutdown().await;
}
