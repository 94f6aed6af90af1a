//! Atomic counters for the tiered resolver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::snapshot::TelemetrySnapshot;

/// Counters updated by the orchestrator and its cache client.
///
/// All updates use relaxed atomics; a snapshot is consistent per counter,
/// not across counters.
#[derive(Debug)]
pub struct ResolverMetrics {
    started_at: Instant,

    requests_started: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    requests_rejected: AtomicU64,

    cells_cached: AtomicU64,
    cells_stored: AtomicU64,
    cells_computed: AtomicU64,
    cells_coalesced: AtomicU64,

    cache_errors: AtomicU64,
    store_errors: AtomicU64,
    engine_errors: AtomicU64,

    engine_calls: AtomicU64,
    engine_time_us: AtomicU64,
}

impl Default for ResolverMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            requests_started: AtomicU64::new(0),
            requests_succeeded: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            cells_cached: AtomicU64::new(0),
            cells_stored: AtomicU64::new(0),
            cells_computed: AtomicU64::new(0),
            cells_coalesced: AtomicU64::new(0),
            cache_errors: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
            engine_errors: AtomicU64::new(0),
            engine_calls: AtomicU64::new(0),
            engine_time_us: AtomicU64::new(0),
        }
    }

    pub fn request_started(&self) {
        self.requests_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A request rejected by validation or the cell budget before any tier ran.
    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cell_cached(&self) {
        self.cells_cached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cell_stored(&self) {
        self.cells_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cell_computed(&self) {
        self.cells_computed.fetch_add(1, Ordering::Relaxed);
    }

    /// A cell served by waiting on another request's in-flight computation.
    pub fn cell_coalesced(&self) {
        self.cells_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn engine_error(&self) {
        self.engine_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn engine_call(&self, elapsed: Duration) {
        self.engine_calls.fetch_add(1, Ordering::Relaxed);
        self.engine_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            requests_started: self.requests_started.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            cells_cached: self.cells_cached.load(Ordering::Relaxed),
            cells_stored: self.cells_stored.load(Ordering::Relaxed),
            cells_computed: self.cells_computed.load(Ordering::Relaxed),
            cells_coalesced: self.cells_coalesced.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            engine_errors: self.engine_errors.load(Ordering::Relaxed),
            engine_calls: self.engine_calls.load(Ordering::Relaxed),
            engine_time_ms: self.engine_time_us.load(Ordering::Relaxed) / 1000,
        }
    }
}
