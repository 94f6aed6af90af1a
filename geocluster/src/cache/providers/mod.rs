//! Cache provider implementations.
//!
//! Each provider implements the `Cache` trait and manages its own eviction.
//! Providers are normally created via `CacheService::start()`.
//!
//! # Available Providers
//!
//! - [`MemoryCacheProvider`]: In-memory size-bounded cache with per-entry TTL, using moka

mod memory;

pub use memory::MemoryCacheProvider;
