//! Volatile cluster cache.
//!
//! The memory tier is built in three layers:
//!
//! ```text
//! ┌─────────────────────┐
//! │  CellCacheClient    │  CellKey → string key, clusters → bincode bytes,
//! │                     │  per-call deadline, failures degrade to misses
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │   Arc<dyn Cache>    │  generic string → Vec<u8> store with per-entry TTL
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │ MemoryCacheProvider │  moka, size-bounded, owned by a CacheService
//! └─────────────────────┘
//! ```

pub mod clients;
pub mod providers;
mod service;
mod traits;

pub use clients::CellCacheClient;
pub use providers::MemoryCacheProvider;
pub use service::{CacheService, ServiceCacheConfig, DEFAULT_MAINTENANCE_INTERVAL_SECS};
pub use traits::{BoxFuture, Cache, GcResult, ServiceCacheError};
