//! Loading, validating and writing the configuration file.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::size::{format_size, parse_size};
use crate::cluster::{ClusterQueryParams, ParamsError};
use crate::coord::MAX_PRECISION;
use crate::engine::NoisePolicy;
use crate::resolver::{
    DEFAULT_CELL_CONCURRENCY, DEFAULT_COORDINATE_PRECISION, DEFAULT_ENGINE_TIMEOUT,
    DEFAULT_FRESH_TTL, DEFAULT_MAX_CELLS, DEFAULT_POOL_SIZE, DEFAULT_POOL_WAIT,
    DEFAULT_STORE_HIT_TTL, DEFAULT_STORE_TIMEOUT,
};

/// Configuration file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for [{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Returns the directory holding the configuration file.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geocluster")
}

/// Returns the default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    pub default_eps: f64,
    pub default_min_points: u32,
    pub default_grid_size: f64,
    pub coordinate_precision: u32,
    pub max_cells: u64,
    pub clip_to_request: bool,
    pub cell_concurrency: usize,
    pub coalesce: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Memory cache budget in bytes.
    pub memory_size: u64,
    pub store_hit_ttl: Duration,
    pub fresh_ttl: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// JSON-lines file; `None` keeps records in memory only.
    pub path: Option<PathBuf>,
    pub max_record_age: Option<Duration>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub points_path: Option<PathBuf>,
    pub noise: NoisePolicy,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    pub size: usize,
    pub wait_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    /// Directory for `geocluster.log`; `None` logs to stderr only.
    pub directory: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub query: QuerySettings,
    pub cache: CacheSettings,
    pub store: StoreSettings,
    pub engine: EngineSettings,
    pub pool: PoolSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
                request_timeout: Duration::from_secs(30),
            },
            query: QuerySettings {
                default_eps: 0.00025,
                default_min_points: 2,
                default_grid_size: 0.01,
                coordinate_precision: DEFAULT_COORDINATE_PRECISION,
                max_cells: DEFAULT_MAX_CELLS,
                clip_to_request: false,
                cell_concurrency: DEFAULT_CELL_CONCURRENCY,
                coalesce: true,
            },
            cache: CacheSettings {
                memory_size: 256 * 1024 * 1024,
                store_hit_ttl: DEFAULT_STORE_HIT_TTL,
                fresh_ttl: DEFAULT_FRESH_TTL,
                timeout: Duration::from_millis(250),
            },
            store: StoreSettings {
                path: None,
                max_record_age: None,
                timeout: DEFAULT_STORE_TIMEOUT,
            },
            engine: EngineSettings {
                points_path: None,
                noise: NoisePolicy::Drop,
                timeout: DEFAULT_ENGINE_TIMEOUT,
            },
            pool: PoolSettings {
                size: DEFAULT_POOL_SIZE,
                wait_timeout: DEFAULT_POOL_WAIT,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                directory: None,
            },
        }
    }
}

impl ConfigFile {
    /// Loads the default configuration file, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads a configuration file, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parses configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let r = Reader(ini);

        if let Some(v) = r.parsed("server", "bind")? {
            config.server.bind = v;
        }
        if let Some(v) = r.parsed("server", "request_timeout_secs")? {
            config.server.request_timeout = Duration::from_secs(v);
        }

        if let Some(v) = r.parsed("query", "default_eps")? {
            config.query.default_eps = v;
        }
        if let Some(v) = r.parsed("query", "default_min_points")? {
            config.query.default_min_points = v;
        }
        if let Some(v) = r.parsed("query", "default_grid_size")? {
            config.query.default_grid_size = v;
        }
        if let Some(v) = r.parsed("query", "coordinate_precision")? {
            config.query.coordinate_precision = v;
        }
        if let Some(v) = r.parsed("query", "max_cells")? {
            config.query.max_cells = v;
        }
        if let Some(v) = r.boolean("query", "clip_to_request")? {
            config.query.clip_to_request = v;
        }
        if let Some(v) = r.parsed("query", "cell_concurrency")? {
            config.query.cell_concurrency = v;
        }
        if let Some(v) = r.boolean("query", "coalesce")? {
            config.query.coalesce = v;
        }

        if let Some(v) = r.size("cache", "memory_size")? {
            config.cache.memory_size = v;
        }
        if let Some(v) = r.parsed("cache", "store_hit_ttl_secs")? {
            config.cache.store_hit_ttl = Duration::from_secs(v);
        }
        if let Some(v) = r.parsed("cache", "fresh_ttl_secs")? {
            config.cache.fresh_ttl = Duration::from_secs(v);
        }
        if let Some(v) = r.parsed("cache", "timeout_ms")? {
            config.cache.timeout = Duration::from_millis(v);
        }

        config.store.path = r.path("store", "path");
        if let Some(v) = r.parsed("store", "max_record_age_secs")? {
            config.store.max_record_age = Some(Duration::from_secs(v));
        }
        if let Some(v) = r.parsed("store", "timeout_ms")? {
            config.store.timeout = Duration::from_millis(v);
        }

        config.engine.points_path = r.path("engine", "points_path");
        if let Some(v) = r.parsed("engine", "noise")? {
            config.engine.noise = v;
        }
        if let Some(v) = r.parsed("engine", "timeout_ms")? {
            config.engine.timeout = Duration::from_millis(v);
        }

        if let Some(v) = r.parsed("pool", "size")? {
            config.pool.size = v;
        }
        if let Some(v) = r.parsed("pool", "wait_timeout_ms")? {
            config.pool.wait_timeout = Duration::from_millis(v);
        }

        if let Some(v) = r.raw("logging", "level") {
            config.logging.level = v.to_string();
        }
        config.logging.directory = r.path("logging", "directory");

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that single-value parsing cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.query;
        if let Err(e) =
            ClusterQueryParams::new(q.default_eps, q.default_min_points, q.default_grid_size)
        {
            return Err(match e {
                ParamsError::InvalidEps(v) => invalid("query", "default_eps", v, e),
                ParamsError::InvalidMinPoints(v) => invalid("query", "default_min_points", v, e),
                ParamsError::Grid(_) => invalid("query", "default_grid_size", q.default_grid_size, e),
            });
        }

        if q.coordinate_precision > MAX_PRECISION {
            return Err(invalid(
                "query",
                "coordinate_precision",
                q.coordinate_precision,
                format!("must be at most {MAX_PRECISION}"),
            ));
        }
        if q.max_cells == 0 {
            return Err(invalid("query", "max_cells", 0, "must be positive"));
        }
        if q.cell_concurrency == 0 {
            return Err(invalid("query", "cell_concurrency", 0, "must be positive"));
        }
        if self.cache.memory_size == 0 {
            return Err(invalid("cache", "memory_size", 0, "must be positive"));
        }
        if self.pool.size == 0 {
            return Err(invalid("pool", "size", 0, "must be positive"));
        }
        Ok(())
    }

    /// Renders the configuration as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("server"))
            .set("bind", self.server.bind.to_string())
            .set(
                "request_timeout_secs",
                self.server.request_timeout.as_secs().to_string(),
            );

        let q = &self.query;
        ini.with_section(Some("query"))
            .set("default_eps", q.default_eps.to_string())
            .set("default_min_points", q.default_min_points.to_string())
            .set("default_grid_size", q.default_grid_size.to_string())
            .set("coordinate_precision", q.coordinate_precision.to_string())
            .set("max_cells", q.max_cells.to_string())
            .set("clip_to_request", q.clip_to_request.to_string())
            .set("cell_concurrency", q.cell_concurrency.to_string())
            .set("coalesce", q.coalesce.to_string());

        ini.with_section(Some("cache"))
            .set("memory_size", format_size(self.cache.memory_size))
            .set(
                "store_hit_ttl_secs",
                self.cache.store_hit_ttl.as_secs().to_string(),
            )
            .set("fresh_ttl_secs", self.cache.fresh_ttl.as_secs().to_string())
            .set("timeout_ms", millis(self.cache.timeout));

        {
            let mut store = ini.with_section(Some("store"));
            if let Some(path) = &self.store.path {
                store.set("path", path.display().to_string());
            }
            if let Some(age) = self.store.max_record_age {
                store.set("max_record_age_secs", age.as_secs().to_string());
            }
            store.set("timeout_ms", millis(self.store.timeout));
        }

        {
            let mut engine = ini.with_section(Some("engine"));
            if let Some(path) = &self.engine.points_path {
                engine.set("points_path", path.display().to_string());
            }
            engine
                .set(
                    "noise",
                    match self.engine.noise {
                        NoisePolicy::Drop => "drop",
                        NoisePolicy::Singletons => "singletons",
                    },
                )
                .set("timeout_ms", millis(self.engine.timeout));
        }

        ini.with_section(Some("pool"))
            .set("size", self.pool.size.to_string())
            .set("wait_timeout_ms", millis(self.pool.wait_timeout));

        {
            let mut logging = ini.with_section(Some("logging"));
            logging.set("level", self.logging.level.clone());
            if let Some(dir) = &self.logging.directory {
                logging.set("directory", dir.display().to_string());
            }
        }

        ini
    }

    /// Renders the configuration as INI text.
    pub fn to_ini_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.to_ini().write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }
}

fn millis(d: Duration) -> String {
    d.as_millis().to_string()
}

fn invalid(
    section: &'static str,
    key: &'static str,
    value: impl Display,
    reason: impl Display,
) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Typed accessors over an [`Ini`].
struct Reader<'a>(&'a Ini);

impl Reader<'_> {
    fn raw(&self, section: &'static str, key: &'static str) -> Option<&str> {
        self.0
            .section(Some(section))
            .and_then(|props| props.get(key))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, section: &'static str, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.raw(section, key) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e| invalid(section, key, value, e)),
        }
    }

    fn boolean(&self, section: &'static str, key: &'static str) -> Result<Option<bool>, ConfigError> {
        match self.raw(section, key) {
            None => Ok(None),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(invalid(section, key, value, "expected true or false")),
            },
        }
    }

    fn size(&self, section: &'static str, key: &'static str) -> Result<Option<u64>, ConfigError> {
        match self.raw(section, key) {
            None => Ok(None),
            Some(value) => parse_size(value)
                .map(Some)
                .ok_or_else(|| invalid(section, key, value, "expected a size such as 256MB")),
        }
    }

    fn path(&self, section: &'static str, key: &'static str) -> Option<PathBuf> {
        self.raw(section, key).map(PathBuf::from)
    }
}
