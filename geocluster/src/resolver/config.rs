//! Resolver configuration.

use std::time::Duration;

/// Default number of decimal digits kept by bounding-box normalization.
pub const DEFAULT_COORDINATE_PRECISION: u32 = 4;

/// Default upper bound on cells per query.
pub const DEFAULT_MAX_CELLS: u64 = 10_000;

/// Default number of cells resolved concurrently within one query.
pub const DEFAULT_CELL_CONCURRENCY: usize = 4;

/// Default TTL for cache entries written through from the store.
pub const DEFAULT_STORE_HIT_TTL: Duration = Duration::from_secs(3600);

/// Default TTL for cache entries holding fresh engine results.
pub const DEFAULT_FRESH_TTL: Duration = Duration::from_secs(600);

/// Default deadline for one store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for one engine call.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(20);

/// Tuning for [`TierCacheOrchestrator`](super::TierCacheOrchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Decimal digits kept when normalizing request corners.
    pub coordinate_precision: u32,
    /// Queries covering more cells are rejected before any tier is touched.
    pub max_cells: u64,
    /// Drop cached/stored clusters whose centroid lies outside the raw request box.
    pub clip_to_request: bool,
    /// Cells in flight at once within one query.
    pub cell_concurrency: usize,
    /// Share one store/engine round trip between concurrent misses on a cell.
    pub coalesce: bool,
    /// TTL for cache entries populated from a store hit.
    pub store_hit_ttl: Duration,
    /// TTL for cache entries populated from a fresh computation.
    pub fresh_ttl: Duration,
    /// Deadline for each store call.
    pub store_timeout: Duration,
    /// Deadline for each engine call.
    pub engine_timeout: Duration,
    /// Persisted records older than this are ignored. `None` keeps them forever.
    pub max_record_age: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            max_cells: DEFAULT_MAX_CELLS,
            clip_to_request: false,
            cell_concurrency: DEFAULT_CELL_CONCURRENCY,
            coalesce: true,
            store_hit_ttl: DEFAULT_STORE_HIT_TTL,
            fresh_ttl: DEFAULT_FRESH_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            engine_timeout: DEFAULT_ENGINE_TIMEOUT,
            max_record_age: None,
        }
    }
}

impl ResolverConfig {
    pub fn with_max_cells(mut self, max_cells: u64) -> Self {
        self.max_cells = max_cells;
        self
    }

    pub fn with_cell_concurrency(mut self, concurrency: usize) -> Self {
        self.cell_concurrency = concurrency.max(1);
        self
    }

    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce = enabled;
        self
    }

    pub fn with_clip_to_request(mut self, enabled: bool) -> Self {
        self.clip_to_request = enabled;
        self
    }

    pub fn with_ttls(mut self, store_hit: Duration, fresh: Duration) -> Self {
        self.store_hit_ttl = store_hit;
        self.fresh_ttl = fresh;
        self
    }

    pub fn with_timeouts(mut self, store: Duration, engine: Duration) -> Self {
        self.store_timeout = store;
        self.engine_timeout = engine;
        self
    }

    pub fn with_max_record_age(mut self, age: Option<Duration>) -> Self {
        self.max_record_age = age;
        self
    }
}
