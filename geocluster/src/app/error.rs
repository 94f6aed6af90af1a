//! Application error types.

use std::fmt;

use crate::cache::ServiceCacheError;
use crate::engine::EngineError;
use crate::store::StoreError;

/// Errors that can occur during application lifecycle.
#[derive(Debug)]
pub enum AppError {
    /// Failed to start memory cache service.
    MemoryCacheStart(ServiceCacheError),

    /// Failed to open the persistent store.
    StoreOpen(StoreError),

    /// Failed to load the engine's point set.
    EngineLoad(EngineError),

    /// Configuration error.
    Config(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MemoryCacheStart(e) => {
                write!(f, "Failed to start memory cache service: {}", e)
            }
            AppError::StoreOpen(e) => {
                write!(f, "Failed to open cluster store: {}", e)
            }
            AppError::EngineLoad(e) => {
                write!(f, "Failed to load clustering engine: {}", e)
            }
            AppError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::MemoryCacheStart(e) => Some(e),
            AppError::StoreOpen(e) => Some(e),
            AppError::EngineLoad(e) => Some(e),
            AppError::Config(_) => None,
        }
    }
}

impl From<ServiceCacheError> for AppError {
    fn from(e: ServiceCacheError) -> Self {
        AppError::MemoryCacheStart(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::StoreOpen(e)
    }
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::EngineLoad(e)
    }
}
