//! Connection pool limiter for store and engine operations.
//!
//! The store and engine share one bounded pool of connections. Every tier-2
//! and tier-3 operation holds a [`PoolPermit`] for its duration, so the pool
//! size caps concurrent store/engine work across all requests.
//!
//! ```text
//! Pool Size: 20
//! ├── 14 held by in-flight cell resolutions
//! └──  6 available
//!
//! acquire(): take a permit, waiting at most `wait_timeout`
//!            ├── granted  → PoolPermit (released on drop)
//!            └── timed out → ResolveError::PoolExhausted
//! ```
//!
//! Waiting is bounded: a saturated pool fails requests with an explicit
//! capacity error instead of queueing them indefinitely.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use super::error::ResolveError;

/// Default pool size.
pub const DEFAULT_POOL_SIZE: usize = 20;

/// Default time a caller waits for a permit.
pub const DEFAULT_POOL_WAIT: Duration = Duration::from_secs(2);

/// Bounded permit pool for store/engine work.
#[derive(Debug)]
pub struct PoolLimiter {
    semaphore: Arc<Semaphore>,
    size: usize,
    wait_timeout: Duration,

    /// Current number of operations holding a permit.
    /// Uses Arc so permits can outlive a borrow of the limiter.
    in_flight: Arc<AtomicUsize>,

    /// Label for logging
    label: String,
}

impl PoolLimiter {
    /// Creates a limiter.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of concurrent operations allowed (at least 1)
    /// * `wait_timeout` - Longest a caller waits for a permit
    /// * `label` - Human-readable label for logging
    pub fn new(size: usize, wait_timeout: Duration, label: impl Into<String>) -> Self {
        let size = size.max(1);
        let label = label.into();

        tracing::info!(
            size,
            wait_timeout_ms = wait_timeout.as_millis() as u64,
            label = %label,
            "Created connection pool limiter"
        );

        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
            wait_timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
            label,
        }
    }

    /// Creates a limiter with default size and wait timeout.
    pub fn with_defaults(label: impl Into<String>) -> Self {
        Self::new(DEFAULT_POOL_SIZE, DEFAULT_POOL_WAIT, label)
    }

    /// Acquires a permit, waiting at most the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::PoolExhausted`] if no permit became free in time.
    pub async fn acquire(&self) -> Result<PoolPermit, ResolveError> {
        // Fast path
        let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                match tokio::time::timeout(
                    self.wait_timeout,
                    Arc::clone(&self.semaphore).acquire_owned(),
                )
                .await
                {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_)) | Err(_) => {
                        warn!(
                            label = %self.label,
                            size = self.size,
                            waited_ms = self.wait_timeout.as_millis() as u64,
                            "Connection pool exhausted"
                        );
                        return Err(ResolveError::PoolExhausted {
                            waited: self.wait_timeout,
                        });
                    }
                }
            }
        };

        self.in_flight.fetch_add(1, Ordering::Relaxed);
        Ok(PoolPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Returns the label for this limiter.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the pool size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the current number of operations holding a permit.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns the number of permits currently available.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A permit from the pool limiter.
///
/// Counts against the pool while held. Automatically released when dropped.
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
