//! Application bootstrap implementation.
//!
//! This module contains `ClusterApp` which starts every collaborator in
//! order, wires them into the orchestrator, runs queries end to end and shuts
//! everything down again.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::config::AppConfig;
use super::error::AppError;
use super::request::ClusterRequest;
use crate::cache::{CacheService, CellCacheClient};
use crate::coord::{self, BoundingBox};
use crate::engine::{ClusteringEngine, PointSet, PointSetEngine};
use crate::resolver::{
    ClusterResponse, PoolLimiter, ResolveError, ResultAggregator, TierCacheOrchestrator,
    TimeoutTier,
};
use crate::store::{ClusterStore, FileClusterStore, MemoryClusterStore};
use crate::telemetry::{ResolverMetrics, TelemetrySnapshot};

/// Service-wide statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStats {
    #[serde(flatten)]
    pub telemetry: TelemetrySnapshot,
    pub cache_entries: u64,
    pub cache_bytes: u64,
    pub store_records: usize,
    pub in_flight_cells: usize,
}

/// The clustering service with explicit lifecycle management.
///
/// Collaborators are started in order:
/// 1. Memory cache service (owns its maintenance task)
/// 2. Persistent store (opened and indexed)
/// 3. Clustering engine (point set loaded)
/// 4. Connection pool limiter, metrics and the orchestrator
///
/// # Example
///
/// ```ignore
/// use geocluster::app::{AppConfig, ClusterApp, ClusterRequest};
///
/// let app = ClusterApp::start(AppConfig::default()).await?;
///
/// let response = app
///     .query(&ClusterRequest::new(22.90, 40.60, 22.95, 40.65))
///     .await?;
///
/// app.shutdown().await;
/// ```
pub struct ClusterApp {
    /// Memory cache service (owns eviction and expiry).
    cache_service: CacheService,

    /// Persistent store, retained for flushing on shutdown.
    store: Arc<dyn ClusterStore>,

    orchestrator: Arc<TierCacheOrchestrator>,

    metrics: Arc<ResolverMetrics>,

    config: AppConfig,
}

impl ClusterApp {
    /// Start the application with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache service fails to start, the store file
    /// cannot be opened, or the point set cannot be loaded.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let store: Arc<dyn ClusterStore> = match &config.store.path {
            Some(path) => Arc::new(FileClusterStore::open(path).await?),
            None => {
                info!("No store path configured, using in-memory cluster store");
                Arc::new(MemoryClusterStore::new())
            }
        };

        let points = match &config.engine.points_path {
            Some(path) => PointSet::load(path).await?,
            None => {
                warn!("No point set configured, engine starts empty");
                PointSet::default()
            }
        };
        let engine: Arc<dyn ClusteringEngine> =
            Arc::new(PointSetEngine::new(points, config.engine.noise));

        Self::start_with(config, store, engine).await
    }

    /// Start the application around an existing store and engine.
    pub async fn start_with(
        config: AppConfig,
        store: Arc<dyn ClusterStore>,
        engine: Arc<dyn ClusteringEngine>,
    ) -> Result<Self, AppError> {
        info!("Starting ClusterApp");

        // 1. Memory cache service FIRST
        let cache_service = CacheService::start(config.memory_service_config())
            .await
            .map_err(AppError::MemoryCacheStart)?;

        // 2. Shared collaborators
        let metrics = Arc::new(ResolverMetrics::new());
        let cache = CellCacheClient::with_metrics(cache_service.cache(), Arc::clone(&metrics))
            .with_timeout(config.memory_cache.timeout);
        let limiter = Arc::new(PoolLimiter::new(
            config.pool.size,
            config.pool.wait_timeout,
            "store/engine",
        ));

        // 3. Orchestrator
        let orchestrator = Arc::new(TierCacheOrchestrator::new(
            cache,
            Arc::clone(&store),
            engine,
            limiter,
            Arc::clone(&metrics),
            config.resolver.clone(),
        ));

        info!(
            memory_cache_bytes = config.memory_cache.max_size_bytes,
            store_records = store.record_count(),
            max_cells = config.resolver.max_cells,
            coalesce = config.resolver.coalesce,
            "ClusterApp started"
        );

        Ok(Self {
            cache_service,
            store,
            orchestrator,
            metrics,
            config,
        })
    }

    /// Runs one query end to end: normalize, tile, resolve, aggregate.
    ///
    /// The whole call is bounded by the configured request timeout.
    #[instrument(skip_all, fields(lon1 = request.lon1, lat1 = request.lat1, lon2 = request.lon2, lat2 = request.lat2))]
    pub async fn query(&self, request: &ClusterRequest) -> Result<ClusterResponse, ResolveError> {
        self.metrics.request_started();

        let deadline = self.config.server.request_timeout;
        let result = match tokio::time::timeout(deadline, self.run_query(request)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout {
                tier: TimeoutTier::Request,
                after: deadline,
            }),
        };

        match &result {
            Ok(_) => self.metrics.request_succeeded(),
            Err(e) if e.is_client_error() => self.metrics.request_rejected(),
            Err(_) => self.metrics.request_failed(),
        }
        result
    }

    async fn run_query(&self, request: &ClusterRequest) -> Result<ClusterResponse, ResolveError> {
        let resolver = &self.config.resolver;
        let params = request.params_or(&self.config.defaults);
        params.validate()?;

        let bbox = coord::normalize(
            request.lon1,
            request.lat1,
            request.lon2,
            request.lat2,
            resolver.coordinate_precision,
        )?;
        let cells = coord::cells_within_budget(&bbox, params.grid_size, resolver.max_cells)?;

        let resolutions = self.orchestrator.resolve_cells(cells, params).await?;

        let aggregator = if resolver.clip_to_request {
            ResultAggregator::clipped_to(BoundingBox::from_corners(
                request.lon1,
                request.lat1,
                request.lon2,
                request.lat2,
            )?)
        } else {
            ResultAggregator::new()
        };
        Ok(aggregator.aggregate(resolutions))
    }

    /// Get the orchestrator.
    pub fn orchestrator(&self) -> Arc<TierCacheOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Get the application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get current service statistics.
    pub fn stats(&self) -> AppStats {
        let cache = self.orchestrator.cache();
        AppStats {
            telemetry: self.metrics.snapshot(),
            cache_entries: cache.entry_count(),
            cache_bytes: cache.size_bytes(),
            store_records: self.store.record_count(),
            in_flight_cells: self.orchestrator.in_flight(),
        }
    }

    /// Shutdown the application gracefully.
    ///
    /// Flushes the store, then stops the cache service.
    pub async fn shutdown(self) {
        info!("Shutting down ClusterApp");

        match tokio::time::timeout(Duration::from_secs(10), self.store.flush()).await {
            Ok(Ok(())) => info!("Cluster store flushed"),
            Ok(Err(e)) => warn!(error = %e, "Cluster store flush failed"),
            Err(_) => warn!("Cluster store flush timed out"),
        }

        self.cache_service.shutdown().await;

        let snapshot = self.metrics.snapshot();
        info!(
            requests = snapshot.requests_started,
            cells = snapshot.cells_resolved(),
            uptime = %snapshot.uptime_human(),
            "ClusterApp shutdown complete"
        );
    }
}
