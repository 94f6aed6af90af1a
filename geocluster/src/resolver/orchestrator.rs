//! Tiered cell resolution.
//!
//! For every cell a query overlaps, the orchestrator walks three tiers and
//! stops at the first that answers:
//!
//! ```text
//!              ┌──────────────┐  hit
//!  cell ──────►│ memory cache │──────────────────────────────► Tier::Cache
//!              └──────┬───────┘
//!                     │ miss / error / timeout
//!              ┌──────▼───────┐
//!              │  coalescer   │──── follower: await leader ──► leader's tier
//!              └──────┬───────┘
//!                     │ leader (holds a pool permit from here)
//!              ┌──────▼───────┐  hit      write-through (long TTL)
//!              │    store     │─────────────────────────────► Tier::Store
//!              └──────┬───────┘
//!                     │ miss
//!              ┌──────▼───────┐  insert record, cache (short TTL)
//!              │    engine    │─────────────────────────────► Tier::Engine
//!              └──────────────┘
//! ```
//!
//! # Failure Semantics
//!
//! Cache failures are misses. A store or engine failure (including a timeout
//! or an exhausted pool) for any cell fails the whole call and discards the
//! cells already resolved. Writes made for those cells stay in place: the
//! flow is not transactional, and each write is self-consistent.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, error, instrument};

use super::aggregate::{CellResolution, ClusterResponse, ResultAggregator, Tier};
use super::coalesce::{CoalesceResult, CoalescedOutcome, RequestCoalescer};
use super::config::ResolverConfig;
use super::error::{ResolveError, TimeoutTier};
use super::limiter::PoolLimiter;
use crate::cache::CellCacheClient;
use crate::cluster::{CellKey, ClusterQueryParams, ClusterResult, PersistedClusterRecord};
use crate::coord::{self, BoundingBox, CellRange, GridCell};
use crate::engine::{ClusteringEngine, EngineError};
use crate::store::{ClusterStore, StoreError};
use crate::telemetry::ResolverMetrics;

/// Resolves cells through the cache, store and engine tiers.
pub struct TierCacheOrchestrator {
    cache: CellCacheClient,
    store: Arc<dyn ClusterStore>,
    engine: Arc<dyn ClusteringEngine>,
    limiter: Arc<PoolLimiter>,
    coalescer: RequestCoalescer,
    metrics: Arc<ResolverMetrics>,
    config: ResolverConfig,
}

impl TierCacheOrchestrator {
    pub fn new(
        cache: CellCacheClient,
        store: Arc<dyn ClusterStore>,
        engine: Arc<dyn ClusteringEngine>,
        limiter: Arc<PoolLimiter>,
        metrics: Arc<ResolverMetrics>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            cache,
            store,
            engine,
            limiter,
            coalescer: RequestCoalescer::new(),
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ResolverMetrics> {
        &self.metrics
    }

    pub fn cache(&self) -> &CellCacheClient {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn ClusterStore> {
        &self.store
    }

    /// Number of cell keys currently being resolved by a coalescing leader.
    pub fn in_flight(&self) -> usize {
        self.coalescer.in_flight()
    }

    /// Resolves every cell `bbox` overlaps and merges the results.
    ///
    /// `bbox` must already be normalized. Capacity is checked before any tier
    /// is touched.
    #[instrument(skip_all, fields(bbox = %bbox, grid = params.grid_size, eps = params.eps, min_points = params.min_points))]
    pub async fn resolve(
        &self,
        bbox: &BoundingBox,
        params: ClusterQueryParams,
    ) -> Result<ClusterResponse, ResolveError> {
        params.validate()?;
        let cells = coord::cells_within_budget(bbox, params.grid_size, self.config.max_cells)?;
        let resolutions = self.resolve_cells(cells, params).await?;
        Ok(ResultAggregator::new().aggregate(resolutions))
    }

    /// Resolves each cell in `cells`, returning per-cell provenance in
    /// row-major cell order.
    ///
    /// Up to `cell_concurrency` cells are in flight at once. The first
    /// failure cancels the remaining cells and is returned.
    #[instrument(skip_all, fields(cells = cells.len()))]
    pub async fn resolve_cells(
        &self,
        cells: CellRange,
        params: ClusterQueryParams,
    ) -> Result<Vec<CellResolution>, ResolveError> {
        stream::iter(cells.iter())
            .map(|cell| self.resolve_cell(cell, params))
            .buffered(self.config.cell_concurrency.max(1))
            .try_collect()
            .await
    }

    async fn resolve_cell(
        &self,
        cell: GridCell,
        params: ClusterQueryParams,
    ) -> Result<CellResolution, ResolveError> {
        let key = CellKey::new(cell, params);

        if let Some(clusters) = self.cache.get(&key).await {
            return Ok(self.resolved(cell, Tier::Cache, clusters));
        }

        if !self.config.coalesce {
            return self.resolve_uncached(key).await;
        }

        loop {
            match self.coalescer.register(key.to_key()) {
                CoalesceResult::Leader(guard) => {
                    // An error drops the guard and releases followers
                    let resolution = self.resolve_uncached(key).await?;
                    guard.complete(CoalescedOutcome {
                        tier: resolution.tier,
                        clusters: Arc::new(resolution.clusters.clone()),
                    });
                    return Ok(resolution);
                }
                CoalesceResult::Coalesced(mut rx) => match rx.recv().await {
                    Ok(outcome) => {
                        self.metrics.cell_coalesced();
                        let clusters = outcome.clusters.as_ref().clone();
                        return Ok(self.resolved(cell, outcome.tier, clusters));
                    }
                    Err(_) => {
                        debug!(cell_x = cell.x, cell_y = cell.y, "Coalesced leader gave up, retrying");
                    }
                },
            }
        }
    }

    /// Store, then engine. Holds one pool permit throughout.
    async fn resolve_uncached(&self, key: CellKey) -> Result<CellResolution, ResolveError> {
        let _permit = self.limiter.acquire().await?;
        let cell = key.cell;
        let params = key.params;

        let records = self.store_call(self.store.query(cell, params)).await?;
        if let Some(record) = self.newest_fresh(records) {
            self.cache
                .set(&key, &record.clusters, self.config.store_hit_ttl)
                .await;
            return Ok(self.resolved(cell, Tier::Store, record.clusters));
        }

        let started = Instant::now();
        let clusters = self
            .engine_call(
                self.engine
                    .cluster(cell, params.grid_size, params.eps, params.min_points),
            )
            .await?;
        self.metrics.engine_call(started.elapsed());

        self.store_call(
            self.store
                .insert(PersistedClusterRecord::new(key, clusters.clone())),
        )
        .await?;
        self.cache.set(&key, &clusters, self.config.fresh_ttl).await;

        Ok(self.resolved(cell, Tier::Engine, clusters))
    }

    /// Picks the newest record within the staleness limit.
    fn newest_fresh(&self, records: Vec<PersistedClusterRecord>) -> Option<PersistedClusterRecord> {
        let max_age = self
            .config
            .max_record_age
            .and_then(|age| chrono::Duration::from_std(age).ok());
        let now = Utc::now();

        // max_by_key keeps the last of equal keys, which is the latest append
        records
            .into_iter()
            .filter(|r| max_age.map_or(true, |age| now.signed_duration_since(r.created_at) <= age))
            .max_by_key(|r| r.created_at)
    }

    fn resolved(&self, cell: GridCell, tier: Tier, clusters: Vec<ClusterResult>) -> CellResolution {
        match tier {
            Tier::Cache => self.metrics.cell_cached(),
            Tier::Store => self.metrics.cell_stored(),
            Tier::Engine => self.metrics.cell_computed(),
        }
        debug!(
            cell_x = cell.x,
            cell_y = cell.y,
            tier = %tier,
            clusters = clusters.len(),
            "Cell resolved"
        );
        CellResolution {
            cell,
            tier,
            clusters,
        }
    }

    async fn store_call<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ResolveError> {
        let after = self.config.store_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.metrics.store_error();
                error!(error = %e, "Store call failed");
                Err(e.into())
            }
            Err(_) => {
                self.metrics.store_error();
                error!(timeout_ms = after.as_millis() as u64, "Store call timed out");
                Err(timeout(TimeoutTier::Store, after))
            }
        }
    }

    async fn engine_call<T>(
        &self,
        call: impl Future<Output = Result<T, EngineError>>,
    ) -> Result<T, ResolveError> {
        let after = self.config.engine_timeout;
        match tokio::time::timeout(after, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.metrics.engine_error();
                error!(error = %e, "Engine call failed");
                Err(e.into())
            }
            Err(_) => {
                self.metrics.engine_error();
                error!(timeout_ms = after.as_millis() as u64, "Engine call timed out");
                Err(timeout(TimeoutTier::Engine, after))
            }
        }
    }
}

fn timeout(tier: TimeoutTier, after: Duration) -> ResolveError {
    ResolveError::Timeout { tier, after }
}
