//! Resolver error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::cluster::ParamsError;
use crate::coord::CoordError;
use crate::engine::EngineError;
use crate::store::StoreError;

/// Which collaborator a deadline applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutTier {
    Store,
    Engine,
    Request,
}

impl std::fmt::Display for TimeoutTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TimeoutTier::Store => "store",
            TimeoutTier::Engine => "engine",
            TimeoutTier::Request => "request",
        })
    }
}

/// Errors from resolving a query.
///
/// Memory cache failures never surface here; they degrade to misses.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Malformed or out-of-range input. Nothing was touched.
    #[error("{0}")]
    Validation(String),

    /// The region covers more cells than allowed. Nothing was touched.
    #[error("Query too large: {cells} cells (max: {max})")]
    QueryTooLarge { cells: u64, max: u64 },

    /// No store/engine connection became free within the wait timeout.
    #[error("Connection pool exhausted after waiting {}ms", waited.as_millis())]
    PoolExhausted { waited: Duration },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("{tier} timed out after {}ms", after.as_millis())]
    Timeout { tier: TimeoutTier, after: Duration },
}

impl ResolveError {
    /// Returns true if the caller is at fault (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ResolveError::Validation(_) | ResolveError::QueryTooLarge { .. }
        )
    }
}

impl From<CoordError> for ResolveError {
    fn from(err: CoordError) -> Self {
        match err {
            CoordError::TooManyCells { cells, max } => ResolveError::QueryTooLarge { cells, max },
            other => ResolveError::Validation(other.to_string()),
        }
    }
}

impl From<ParamsError> for ResolveError {
    fn from(err: ParamsError) -> Self {
        match err {
            ParamsError::Grid(coord) => coord.into(),
            other => ResolveError::Validation(other.to_string()),
        }
    }
}
