//! Persistent store interface.

use std::io;

use thiserror::Error;

use crate::cache::BoxFuture;
use crate::cluster::{ClusterQueryParams, PersistedClusterRecord};
use crate::coord::GridCell;

/// Errors from a persistent cluster store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded.
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Append-only keyed storage of cluster sets.
///
/// Implementations must be `Send + Sync`; the orchestrator shares one store
/// across every in-flight request as `Arc<dyn ClusterStore>`.
pub trait ClusterStore: Send + Sync {
    /// Returns every record stored for exactly this cell and parameter set,
    /// oldest first. An empty list means the cell has never been persisted.
    fn query(
        &self,
        cell: GridCell,
        params: ClusterQueryParams,
    ) -> BoxFuture<'_, Result<Vec<PersistedClusterRecord>, StoreError>>;

    /// Appends a record.
    fn insert(&self, record: PersistedClusterRecord) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Total number of records held.
    fn record_count(&self) -> usize;

    /// Flushes buffered writes to durable storage.
    fn flush(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}
