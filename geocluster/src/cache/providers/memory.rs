//! In-memory cache provider using moka.
//!
//! This provider wraps `moka::future::Cache` to provide an async-safe,
//! lock-free in-memory cache with size-bounded eviction and per-entry
//! time-to-live.
//!
//! # Expiry
//!
//! Each entry carries its own TTL. A moka [`Expiry`] policy reads it on
//! insert and on replacement, so a write-through from the store and a fresh
//! engine result can live for different durations in the same cache.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache as MokaCache;
use moka::Expiry;

use crate::cache::traits::{BoxFuture, Cache, GcResult, ServiceCacheError};

/// Maximum accepted key length in bytes.
pub const MAX_KEY_BYTES: usize = 1024;

/// Cached value plus the TTL it was written with.
#[derive(Clone)]
struct Entry {
    data: Arc<Vec<u8>>,
    ttl: Option<Duration>,
}

/// Expiry policy that honours the TTL stored in each entry.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-memory cache provider using moka.
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: MokaCache<String, Entry>,

    /// Maximum size in bytes.
    max_size_bytes: AtomicU64,

    /// Set once the owning service shuts down.
    closed: AtomicBool,
}

impl MemoryCacheProvider {
    /// Create a new memory cache provider.
    ///
    /// # Arguments
    ///
    /// * `max_size_bytes` - Maximum cache size in bytes (keys plus values)
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            // Weight each entry by its key and data size
            .weigher(|key: &String, value: &Entry| -> u32 {
                // moka uses u32 for weights, cap at u32::MAX for very large entries
                (key.len() + value.data.len()).min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            cache,
            max_size_bytes: AtomicU64::new(max_size_bytes),
            closed: AtomicBool::new(false),
        }
    }

    /// Rejects all further operations with [`ServiceCacheError::ShuttingDown`].
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn check_open(&self) -> Result<(), ServiceCacheError> {
        if self.closed.load(Ordering::Acquire) {
            Err(ServiceCacheError::ShuttingDown)
        } else {
            Ok(())
        }
    }
}

impl Cache for MemoryCacheProvider {
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_open()?;
            if key.len() > MAX_KEY_BYTES {
                return Err(ServiceCacheError::KeyTooLarge {
                    size: key.len(),
                    max: MAX_KEY_BYTES,
                });
            }
            let max = self.max_size_bytes();
            if value.len() as u64 > max {
                return Err(ServiceCacheError::ValueTooLarge {
                    size: value.len(),
                    max,
                });
            }

            let entry = Entry {
                data: Arc::new(value),
                ttl,
            };
            self.cache.insert(key, entry).await;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_open()?;
            Ok(self
                .cache
                .get(&key)
                .await
                .map(|entry| (*entry.data).clone()))
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_open()?;
            Ok(self.cache.remove(&key).await.is_some())
        })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.check_open()?;
            Ok(self.cache.contains_key(&key))
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        Box::pin(async move {
            self.check_open()?;
            self.cache.invalidate_all();
            self.cache.run_pending_tasks().await;
            Ok(())
        })
    }

    fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes.load(Ordering::Relaxed)
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>> {
        Box::pin(async move {
            let start = Instant::now();
            let size_before = self.cache.weighted_size();
            let count_before = self.cache.entry_count();

            // Run pending maintenance tasks (expiry, eviction)
            self.cache.run_pending_tasks().await;

            let size_after = self.cache.weighted_size();
            let count_after = self.cache.entry_count();

            Ok(GcResult {
                entries_removed: count_before.saturating_sub(count_after) as usize,
                bytes_freed: size_before.saturating_sub(size_after),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        })
    }
}
