//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geocluster::app::{AppConfig, ClusterApp};
use geocluster::cache::BoxFuture;
use geocluster::cluster::{ClusterQueryParams, ClusterResult, PersistedClusterRecord};
use geocluster::coord::GridCell;
use geocluster::engine::{ClusteringEngine, EngineError};
use geocluster::store::{ClusterStore, MemoryClusterStore, StoreError};

/// Engine that emits one cluster at the centre of every cell and counts calls.
///
/// Optionally sleeps before answering and fails on a chosen call.
#[derive(Default)]
pub struct CountingEngine {
    calls: AtomicUsize,
    delay: Option<Duration>,
    fail_on_call: Option<usize>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the n-th call (1-based).
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClusteringEngine for CountingEngine {
    fn cluster(
        &self,
        cell: GridCell,
        grid_size: f64,
        _eps: f64,
        _min_points: u32,
    ) -> BoxFuture<'_, Result<Vec<ClusterResult>, EngineError>> {
        let rect = cell.bounds(grid_size);
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_on_call == Some(call) {
                return Err(EngineError::Unavailable("engine offline".to_string()));
            }
            Ok(vec![ClusterResult::new(
                format!("{:.4}:{:.4}", rect.min_lon, rect.min_lat),
                (rect.min_lon + rect.max_lon) / 2.0,
                (rect.min_lat + rect.max_lat) / 2.0,
                3,
            )])
        })
    }
}

/// Store wrapper that counts queries and inserts and can fail inserts.
pub struct CountingStore {
    inner: MemoryClusterStore,
    queries: AtomicUsize,
    inserts: AtomicUsize,
    fail_inserts_after: Option<usize>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryClusterStore::new(),
            queries: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            fail_inserts_after: None,
        }
    }

    /// Accept `n` inserts, then reject every further one.
    pub fn failing_inserts_after(mut self, n: usize) -> Self {
        self.fail_inserts_after = Some(n);
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

impl ClusterStore for CountingStore {
    fn query(
        &self,
        cell: GridCell,
        params: ClusterQueryParams,
    ) -> BoxFuture<'_, Result<Vec<PersistedClusterRecord>, StoreError>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(cell, params)
    }

    fn insert(&self, record: PersistedClusterRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        let attempt = self.inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_inserts_after {
            if attempt >= limit {
                return Box::pin(async { Err(StoreError::Backend("disk full".to_string())) });
            }
        }
        self.inner.insert(record)
    }

    fn record_count(&self) -> usize {
        self.inner.record_count()
    }

    fn flush(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        self.inner.flush()
    }
}

/// Starts an app around the given store and engine.
pub async fn start_app(
    config: AppConfig,
    store: Arc<dyn ClusterStore>,
    engine: Arc<dyn ClusteringEngine>,
) -> ClusterApp {
    ClusterApp::start_with(config, store, engine)
        .await
        .expect("app should start")
}
