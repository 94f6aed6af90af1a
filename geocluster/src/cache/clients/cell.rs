//! Cell cache client for cluster sets.
//!
//! This client wraps a generic `Cache` with:
//! - Key translation: `CellKey` → `"clusters:{x}:{y}:g{grid}:e{eps}:m{minPoints}"`
//! - Value encoding: `Vec<ClusterResult>` ↔ bincode bytes
//! - A per-call deadline
//! - Metrics injection: cache failure reporting
//!
//! The memory tier is an accelerator, never a source of truth. Every failure
//! (timeout, provider error, undecodable bytes) is logged and reported as a
//! miss so the caller falls through to the persistent store.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cache::traits::Cache;
use crate::cluster::{CellKey, ClusterResult};
use crate::telemetry::ResolverMetrics;

/// Default deadline for a single cache call.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(250);

/// Cache client for per-cell cluster sets.
#[derive(Clone)]
pub struct CellCacheClient {
    /// The underlying generic cache.
    cache: Arc<dyn Cache>,

    /// Deadline applied to each get and set.
    timeout: Duration,

    /// Optional metrics for failure reporting.
    metrics: Option<Arc<ResolverMetrics>>,
}

impl CellCacheClient {
    /// Create a new cell cache client without metrics.
    ///
    /// # Arguments
    ///
    /// * `cache` - The underlying cache implementation
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            cache,
            timeout: DEFAULT_CACHE_TIMEOUT,
            metrics: None,
        }
    }

    /// Create a new cell cache client with metrics.
    ///
    /// # Arguments
    ///
    /// * `cache` - The underlying cache implementation
    /// * `metrics` - Resolver metrics for failure reporting
    pub fn with_metrics(cache: Arc<dyn Cache>, metrics: Arc<ResolverMetrics>) -> Self {
        Self {
            cache,
            timeout: DEFAULT_CACHE_TIMEOUT,
            metrics: Some(metrics),
        }
    }

    /// Set the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the cluster set for a cell.
    ///
    /// # Returns
    ///
    /// `Some(clusters)` on a hit (possibly empty), `None` on a miss or any failure
    pub async fn get(&self, key: &CellKey) -> Option<Vec<ClusterResult>> {
        let cache_key = key.to_key();
        let bytes = match tokio::time::timeout(self.timeout, self.cache.get(&cache_key)).await {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(error = %e, key = %cache_key, "Cell cache get failed");
                self.report_error();
                return None;
            }
            Err(_) => {
                warn!(key = %cache_key, timeout_ms = self.timeout.as_millis() as u64, "Cell cache get timed out");
                self.report_error();
                return None;
            }
        };

        match bincode::deserialize::<Vec<ClusterResult>>(&bytes) {
            Ok(clusters) => Some(clusters),
            Err(e) => {
                warn!(error = %e, key = %cache_key, "Discarding undecodable cache entry");
                self.report_error();
                self.delete(&cache_key).await;
                None
            }
        }
    }

    /// Store the cluster set for a cell.
    ///
    /// Failures are logged and otherwise ignored.
    ///
    /// # Arguments
    ///
    /// * `key` - The cell and parameters
    /// * `clusters` - The cluster set (an empty set is a valid value)
    /// * `ttl` - How long the entry stays fresh
    pub async fn set(&self, key: &CellKey, clusters: &[ClusterResult], ttl: Duration) {
        let cache_key = key.to_key();
        let bytes = match bincode::serialize(clusters) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, key = %cache_key, "Failed to encode cluster set");
                self.report_error();
                return;
            }
        };

        match tokio::time::timeout(self.timeout, self.cache.set(&cache_key, bytes, Some(ttl)))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, key = %cache_key, "Cell cache set failed");
                self.report_error();
            }
            Err(_) => {
                warn!(key = %cache_key, "Cell cache set timed out");
                self.report_error();
            }
        }
    }

    /// Remove the cached cluster set for a cell.
    ///
    /// # Returns
    ///
    /// `true` if an entry was removed
    pub async fn invalidate(&self, key: &CellKey) -> bool {
        self.delete(&key.to_key()).await
    }

    /// Remove every cached cluster set.
    pub async fn clear(&self) {
        match tokio::time::timeout(self.timeout, self.cache.clear()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Cell cache clear failed"),
            Err(_) => warn!("Cell cache clear timed out"),
        }
    }

    async fn delete(&self, cache_key: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.cache.delete(cache_key)).await {
            Ok(Ok(removed)) => removed,
            Ok(Err(e)) => {
                warn!(error = %e, key = %cache_key, "Cell cache delete failed");
                self.report_error();
                false
            }
            Err(_) => {
                warn!(key = %cache_key, "Cell cache delete timed out");
                self.report_error();
                false
            }
        }
    }

    /// Get the current cache size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.cache.size_bytes()
    }

    /// Get the current number of entries in the cache.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn report_error(&self) {
        if let Some(ref m) = self.metrics {
            m.cache_error();
        }
    }
}
