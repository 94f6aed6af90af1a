//! Application bootstrap and lifecycle management.
//!
//! This module provides the `ClusterApp` type which owns every collaborator
//! of the tiered resolver and runs queries through it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          ClusterApp                          │
//! │                                                              │
//! │  1. CacheService (memory) ──► CellCacheClient ──┐            │
//! │  2. ClusterStore (file / memory) ───────────────┤            │
//! │  3. ClusteringEngine (point set) ───────────────┼──► Tier-   │
//! │  4. PoolLimiter, ResolverMetrics ───────────────┘    Cache-  │
//! │                                                      Orches- │
//! │  query(): normalize → tile → resolve → aggregate     trator  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is reached through global state: collaborators are constructed
//! at start, injected, and released in `shutdown()`.

mod bootstrap;
mod config;
mod error;
mod request;

pub use bootstrap::{AppStats, ClusterApp};
pub use config::{
    AppConfig, EngineAppConfig, MemoryCacheAppConfig, PoolAppConfig, ServerConfig, StoreAppConfig,
};
pub use error::AppError;
pub use request::ClusterRequest;
