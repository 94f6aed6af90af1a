//! Application configuration for ClusterApp.
//!
//! This module defines `AppConfig` which combines all configuration needed
//! to bootstrap the application: the memory cache, the store, the engine, the
//! connection pool, the resolver and the HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{ServiceCacheConfig, DEFAULT_MAINTENANCE_INTERVAL_SECS};
use crate::cluster::ClusterQueryParams;
use crate::config::ConfigFile;
use crate::engine::NoisePolicy;
use crate::logging::LoggingConfig;
use crate::resolver::{ResolverConfig, DEFAULT_POOL_SIZE, DEFAULT_POOL_WAIT};

/// Application configuration combining all component configs.
///
/// This is the top-level configuration passed to `ClusterApp::start()`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Memory cache configuration.
    pub memory_cache: MemoryCacheAppConfig,

    /// Persistent store configuration.
    pub store: StoreAppConfig,

    /// Clustering engine configuration.
    pub engine: EngineAppConfig,

    /// Shared connection pool configuration.
    pub pool: PoolAppConfig,

    /// Tiered resolver configuration.
    pub resolver: ResolverConfig,

    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Parameters used when a request omits them.
    pub defaults: ClusterQueryParams,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Memory cache configuration for the application.
#[derive(Clone, Debug)]
pub struct MemoryCacheAppConfig {
    /// Maximum cache size in bytes.
    pub max_size_bytes: u64,

    /// Deadline for one cache call.
    pub timeout: Duration,

    /// Interval between expiry/eviction passes.
    pub maintenance_interval_secs: u64,
}

impl Default for MemoryCacheAppConfig {
    fn default() -> Self {
        // Default 256MB memory cache
        Self {
            max_size_bytes: 256 * 1024 * 1024,
            timeout: Duration::from_millis(250),
            maintenance_interval_secs: DEFAULT_MAINTENANCE_INTERVAL_SECS,
        }
    }
}

/// Persistent store configuration for the application.
#[derive(Clone, Debug, Default)]
pub struct StoreAppConfig {
    /// JSON-lines file. `None` selects the in-memory store.
    pub path: Option<PathBuf>,
}

/// Clustering engine configuration for the application.
#[derive(Clone, Debug, Default)]
pub struct EngineAppConfig {
    /// JSON point set. `None` starts with an empty point set.
    pub points_path: Option<PathBuf>,

    /// Handling of points outside any dense region.
    pub noise: NoisePolicy,
}

/// Connection pool configuration.
#[derive(Clone, Debug)]
pub struct PoolAppConfig {
    pub size: usize,
    pub wait_timeout: Duration,
}

impl Default for PoolAppConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            wait_timeout: DEFAULT_POOL_WAIT,
        }
    }
}

/// HTTP server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: SocketAddr,

    /// Bound on one whole query, across all tiers.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_config_file(&ConfigFile::default())
    }
}

impl AppConfig {
    /// Create application config from the configuration file.
    ///
    /// This keeps the translation from file settings to component configs in
    /// one place rather than scattered in CLI code.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        let q = &config.query;
        let resolver = ResolverConfig {
            coordinate_precision: q.coordinate_precision,
            max_cells: q.max_cells,
            clip_to_request: q.clip_to_request,
            cell_concurrency: q.cell_concurrency,
            coalesce: q.coalesce,
            store_hit_ttl: config.cache.store_hit_ttl,
            fresh_ttl: config.cache.fresh_ttl,
            store_timeout: config.store.timeout,
            engine_timeout: config.engine.timeout,
            max_record_age: config.store.max_record_age,
        };

        Self {
            memory_cache: MemoryCacheAppConfig {
                max_size_bytes: config.cache.memory_size,
                timeout: config.cache.timeout,
                maintenance_interval_secs: DEFAULT_MAINTENANCE_INTERVAL_SECS,
            },
            store: StoreAppConfig {
                path: config.store.path.clone(),
            },
            engine: EngineAppConfig {
                points_path: config.engine.points_path.clone(),
                noise: config.engine.noise,
            },
            pool: PoolAppConfig {
                size: config.pool.size,
                wait_timeout: config.pool.wait_timeout,
            },
            resolver,
            server: ServerConfig {
                bind: config.server.bind,
                request_timeout: config.server.request_timeout,
            },
            // ConfigFile::validate has already checked these
            defaults: ClusterQueryParams {
                eps: q.default_eps,
                min_points: q.default_min_points,
                grid_size: q.default_grid_size,
            },
            logging: LoggingConfig::from(&config.logging),
        }
    }

    /// Set the memory cache size.
    pub fn with_memory_cache_size(mut self, max_size_bytes: u64) -> Self {
        self.memory_cache.max_size_bytes = max_size_bytes;
        self
    }

    /// Set the store file.
    pub fn with_store_path(mut self, path: Option<PathBuf>) -> Self {
        self.store.path = path;
        self
    }

    /// Set the engine point set file.
    pub fn with_points_path(mut self, path: Option<PathBuf>) -> Self {
        self.engine.points_path = path;
        self
    }

    /// Set the noise policy.
    pub fn with_noise(mut self, noise: NoisePolicy) -> Self {
        self.engine.noise = noise;
        self
    }

    /// Set the HTTP bind address.
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.server.bind = bind;
        self
    }

    /// Set the whole-query deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.server.request_timeout = timeout;
        self
    }

    /// Set the connection pool.
    pub fn with_pool(mut self, size: usize, wait_timeout: Duration) -> Self {
        self.pool = PoolAppConfig { size, wait_timeout };
        self
    }

    /// Replace the resolver configuration.
    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the parameters used when a request omits them.
    pub fn with_defaults(mut self, defaults: ClusterQueryParams) -> Self {
        self.defaults = defaults;
        self
    }

    /// Memory cache service configuration derived from this config.
    pub fn memory_service_config(&self) -> ServiceCacheConfig {
        let interval = self.memory_cache.maintenance_interval_secs;
        ServiceCacheConfig::memory(
            self.memory_cache.max_size_bytes,
            (interval > 0).then(|| Duration::from_secs(interval)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_file() {
        let mut file = ConfigFile::default();
        file.cache.memory_size = 1024;
        file.query.max_cells = 77;
        file.store.max_record_age = Some(Duration::from_secs(60));
        file.pool.size = 3;

        let config = AppConfig::from_config_file(&file);

        assert_eq!(config.memory_cache.max_size_bytes, 1024);
        assert_eq!(config.resolver.max_cells, 77);
        assert_eq!(config.resolver.max_record_age, Some(Duration::from_secs(60)));
        assert_eq!(config.pool.size, 3);
        assert_eq!(config.defaults.min_points, 2);
        assert_eq!(config.defaults.grid_size, 0.01);
    }

    #[test]
    fn test_builders() {
        let config = AppConfig::default()
            .with_memory_cache_size(42)
            .with_store_path(Some(PathBuf::from("/tmp/s.jsonl")))
            .with_pool(2, Duration::from_millis(5));

        assert_eq!(config.memory_cache.max_size_bytes, 42);
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/s.jsonl")));
        assert_eq!(config.pool.size, 2);
    }

    #[test]
    fn test_memory_service_config() {
        let mut config = AppConfig::default();
        assert!(config.memory_service_config().maintenance_interval.is_some());

        config.memory_cache.maintenance_interval_secs = 0;
        assert!(config.memory_service_config().maintenance_interval.is_none());
    }
}
