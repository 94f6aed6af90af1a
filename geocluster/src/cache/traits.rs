//! Core traits for the generic cache service.
//!
//! The `Cache` trait provides a domain-agnostic key-value interface with
//! per-entry time-to-live. Providers implement it; domain clients such as
//! [`CellCacheClient`](super::CellCacheClient) translate their own keys and
//! values on top of it.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable for debugging, flexible for any domain
//! - **Vec<u8> values**: Raw bytes, no serialization opinions imposed
//! - **TTL per entry**: Callers decide how long each value stays fresh
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support
//!
//! # Example
//!
//! ```ignore
//! use geocluster::cache::{Cache, CacheService, ServiceCacheConfig};
//!
//! let service = CacheService::start(ServiceCacheConfig::memory(64 * 1024 * 1024, None)).await?;
//!
//! let cache = service.cache();
//! cache.set("key", vec![1, 2, 3], Some(Duration::from_secs(60))).await?;
//! let value = cache.get("key").await?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Result of a garbage collection operation.
#[derive(Debug, Clone, Default)]
pub struct GcResult {
    /// Number of entries removed during GC.
    pub entries_removed: usize,
    /// Total bytes freed during GC.
    pub bytes_freed: u64,
    /// Duration of the GC operation in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for GcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GC: removed {} entries, freed {} bytes in {}ms",
            self.entries_removed, self.bytes_freed, self.duration_ms
        )
    }
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum ServiceCacheError {
    /// The cache service is shutting down.
    #[error("Cache is shutting down")]
    ShuttingDown,

    /// Key exceeds maximum allowed size.
    #[error("Key too large: {size} bytes (max: {max})")]
    KeyTooLarge { size: usize, max: usize },

    /// Value exceeds maximum allowed size.
    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: u64 },

    /// Invalid service configuration.
    #[error("Invalid cache configuration: {0}")]
    Config(String),

    /// Provider-specific error.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Generic cache interface for key-value storage with expiry.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
///
/// # Dyn Compatibility
///
/// Async methods return [`BoxFuture`] so the cache can be shared as
/// `Arc<dyn Cache>` and swapped for test doubles.
pub trait Cache: Send + Sync {
    /// Store a value with the given key.
    ///
    /// If the key already exists, the value and its TTL are replaced.
    /// `ttl = None` keeps the entry until it is evicted for space.
    ///
    /// # Errors
    ///
    /// Returns `ServiceCacheError` if:
    /// - Key or value exceeds size limits
    /// - Cache is shutting down
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), ServiceCacheError>>;

    /// Retrieve a value by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(data))` if the key exists and has not expired
    /// - `Ok(None)` if the key is not found
    /// - `Err(_)` if an error occurs
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>>;

    /// Delete a value by key.
    ///
    /// Returns `Ok(true)` if the key existed.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>>;

    /// Check if a key exists without retrieving the value.
    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>>;

    /// Remove every entry.
    fn clear(&self) -> BoxFuture<'_, Result<(), ServiceCacheError>>;

    /// Get the current weighted size of the cache in bytes.
    fn size_bytes(&self) -> u64;

    /// Get the current number of entries in the cache.
    fn entry_count(&self) -> u64;

    /// Get the maximum configured size in bytes.
    fn max_size_bytes(&self) -> u64;

    /// Trigger garbage collection manually.
    ///
    /// For moka-backed providers this runs pending maintenance (expiry and
    /// eviction) and reports what it removed.
    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>>;
}
