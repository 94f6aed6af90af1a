//! INI configuration file.
//!
//! The service reads a single INI file, by default
//! `<config dir>/geocluster/config.ini`:
//!
//! ```ini
//! [server]
//! bind = 0.0.0.0:8080
//! request_timeout_secs = 30
//!
//! [query]
//! default_eps = 0.00025
//! default_min_points = 2
//! default_grid_size = 0.01
//! coordinate_precision = 4
//! max_cells = 10000
//! clip_to_request = false
//! cell_concurrency = 4
//! coalesce = true
//!
//! [cache]
//! memory_size = 256MB
//! store_hit_ttl_secs = 3600
//! fresh_ttl_secs = 600
//! timeout_ms = 250
//!
//! [store]
//! path = /var/lib/geocluster/clusters.jsonl
//! max_record_age_secs = 86400
//! timeout_ms = 5000
//!
//! [engine]
//! points_path = /var/lib/geocluster/points.json
//! noise = drop
//! timeout_ms = 20000
//!
//! [pool]
//! size = 20
//! wait_timeout_ms = 2000
//!
//! [logging]
//! level = info
//! directory = /var/log/geocluster
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

mod file;
mod size;

pub use file::{
    config_directory, config_file_path, CacheSettings, ConfigError, ConfigFile, EngineSettings,
    LoggingSettings, PoolSettings, QuerySettings, ServerSettings, StoreSettings,
};
pub use size::{format_size, parse_size};
