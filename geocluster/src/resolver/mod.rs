//! Tiered cluster resolution.
//!
//! This module is the core of the service. A normalized bounding box is
//! tiled into grid cells; each cell is resolved by the
//! [`TierCacheOrchestrator`] from the memory cache, the persistent store or a
//! fresh engine computation; the [`ResultAggregator`] merges the per-cell
//! results and attributes them to tiers.
//!
//! # Shared Resources
//!
//! - [`PoolLimiter`] bounds concurrent store/engine work across requests
//! - [`RequestCoalescer`] collapses concurrent misses on one cell into a
//!   single store/engine round trip
//!
//! # Example
//!
//! ```ignore
//! use geocluster::coord;
//! use geocluster::cluster::ClusterQueryParams;
//!
//! let bbox = coord::normalize(22.90, 40.60, 22.95, 40.65, 4)?;
//! let params = ClusterQueryParams::new(0.00025, 2, 0.1)?;
//!
//! let response = orchestrator.resolve(&bbox, params).await?;
//! assert_eq!(
//!     response.count,
//!     response.cached_count + response.stored_count + response.new_count
//! );
//! ```

mod aggregate;
mod coalesce;
mod config;
mod error;
mod limiter;
mod orchestrator;

pub use aggregate::{CellResolution, ClusterResponse, ResultAggregator, Tier};
pub use coalesce::{CoalesceResult, CoalescedOutcome, LeaderGuard, RequestCoalescer};
pub use config::{
    ResolverConfig, DEFAULT_CELL_CONCURRENCY, DEFAULT_COORDINATE_PRECISION,
    DEFAULT_ENGINE_TIMEOUT, DEFAULT_FRESH_TTL, DEFAULT_MAX_CELLS, DEFAULT_STORE_HIT_TTL,
    DEFAULT_STORE_TIMEOUT,
};
pub use error::{ResolveError, TimeoutTier};
pub use limiter::{PoolLimiter, PoolPermit, DEFAULT_POOL_SIZE, DEFAULT_POOL_WAIT};
pub use orchestrator::TierCacheOrchestrator;
