//! Cache service lifecycle.
//!
//! A [`CacheService`] owns one provider and its background maintenance task.
//! It is started explicitly during application bootstrap and stopped during
//! shutdown, so nothing reaches the cache through global state.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::providers::MemoryCacheProvider;
use super::traits::{Cache, ServiceCacheError};

/// Default interval between maintenance passes (expiry and eviction).
pub const DEFAULT_MAINTENANCE_INTERVAL_SECS: u64 = 30;

/// Configuration for a cache service.
#[derive(Clone, Debug)]
pub struct ServiceCacheConfig {
    /// Maximum cache size in bytes.
    pub max_size_bytes: u64,

    /// Interval between maintenance passes; `None` disables the background task.
    pub maintenance_interval: Option<Duration>,
}

impl ServiceCacheConfig {
    /// Memory cache configuration.
    pub fn memory(max_size_bytes: u64, maintenance_interval: Option<Duration>) -> Self {
        Self {
            max_size_bytes,
            maintenance_interval,
        }
    }
}

/// A running cache service.
pub struct CacheService {
    provider: Arc<MemoryCacheProvider>,
    shutdown: CancellationToken,
    maintenance: Option<JoinHandle<()>>,
}

impl CacheService {
    /// Start a cache service.
    ///
    /// Must be called from within a Tokio runtime when a maintenance
    /// interval is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceCacheError::Config`] if the size limit is zero.
    pub async fn start(config: ServiceCacheConfig) -> Result<Self, ServiceCacheError> {
        if config.max_size_bytes == 0 {
            return Err(ServiceCacheError::Config(
                "max_size_bytes must be greater than zero".to_string(),
            ));
        }

        let provider = Arc::new(MemoryCacheProvider::new(config.max_size_bytes));
        let shutdown = CancellationToken::new();

        let maintenance = config.maintenance_interval.map(|interval| {
            let provider = Arc::clone(&provider);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                run_maintenance(provider, interval, shutdown).await;
            })
        });

        info!(
            max_size_bytes = config.max_size_bytes,
            maintenance = maintenance.is_some(),
            "Memory cache service started"
        );

        Ok(Self {
            provider,
            shutdown,
            maintenance,
        })
    }

    /// Returns the cache as a trait object for injection into clients.
    pub fn cache(&self) -> Arc<dyn Cache> {
        Arc::clone(&self.provider) as Arc<dyn Cache>
    }

    /// Stops maintenance and rejects further cache operations.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.maintenance.take() {
            let _ = handle.await;
        }
        self.provider.close();
        info!("Memory cache service stopped");
    }
}

async fn run_maintenance(
    provider: Arc<MemoryCacheProvider>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if let Ok(result) = provider.gc().await {
                    if result.entries_removed > 0 {
                        debug!(%result, "Memory cache maintenance");
                    }
                }
            }
        }
    }
}
