//! In-process cluster store.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{ClusterStore, StoreError};
use crate::cache::BoxFuture;
use crate::cluster::{CellKey, ClusterQueryParams, PersistedClusterRecord};
use crate::coord::GridCell;

/// Append-only store held entirely in memory.
///
/// Used when no store path is configured and as the default in tests.
/// Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryClusterStore {
    records: RwLock<HashMap<String, Vec<PersistedClusterRecord>>>,
}

impl MemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClusterStore for MemoryClusterStore {
    fn query(
        &self,
        cell: GridCell,
        params: ClusterQueryParams,
    ) -> BoxFuture<'_, Result<Vec<PersistedClusterRecord>, StoreError>> {
        let key = CellKey::new(cell, params).to_key();
        let found = self.records.read().get(&key).cloned().unwrap_or_default();
        Box::pin(async move { Ok(found) })
    }

    fn insert(&self, record: PersistedClusterRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = record.key().to_key();
        self.records.write().entry(key).or_default().push(record);
        Box::pin(async { Ok(()) })
    }

    fn record_count(&self) -> usize {
        self.records.read().values().map(Vec::len).sum()
    }

    fn flush(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterResult;

    fn params(eps: f64) -> ClusterQueryParams {
        ClusterQueryParams::new(eps, 2, 0.1).unwrap()
    }

    #[tokio::test]
    async fn test_query_empty() {
        let store = MemoryClusterStore::new();
        let records = store.query(GridCell::new(0, 0), params(0.001)).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_insert_is_append_only() {
        let store = MemoryClusterStore::new();
        let key = CellKey::new(GridCell::new(229, 406), params(0.001));

        store
            .insert(PersistedClusterRecord::new(key, vec![]))
            .await
            .unwrap();
        store
            .insert(PersistedClusterRecord::new(
                key,
                vec![ClusterResult::new("1", 22.95, 40.63, 4)],
            ))
            .await
            .unwrap();

        let records = store.query(key.cell, key.params).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].clusters.is_empty());
        assert_eq!(records[1].clusters.len(), 1);
        assert_eq!(store.record_count(), 2);
    }

    #[tokio::test]
    async fn test_parameters_isolate_records() {
        let store = MemoryClusterStore::new();
        let cell = GridCell::new(1, 1);

        store
            .insert(PersistedClusterRecord::new(
                CellKey::new(cell, params(0.001)),
                vec![],
            ))
            .await
            .unwrap();

        assert_eq!(store.query(cell, params(0.001)).await.unwrap().len(), 1);
        assert!(store.query(cell, params(0.002)).await.unwrap().is_empty());
    }
}
