//! Configuration for every subsystem, with serde defaults.
//!
//! `EngramConfig::from_env` honors `MEMORY_DB_PATH` and `MONITORING_MODE`.

pub mod cache_config;
pub mod defaults;
pub mod limiter_config;
pub mod monitor_config;
pub mod session_config;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use cache_config::CacheConfig;
pub use limiter_config::{LimiterConfig, WindowStrategy};
pub use monitor_config::{MonitorConfig, ThresholdBand, Thresholds};
pub use session_config::SessionConfig;

use crate::errors::EngramResult;
use crate::size::parse_size;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    /// Relational store path, or `:memory:` for an in-memory database.
    pub db_path: String,
    /// Directory for the vector index image + metadata files.
    pub vector_dir: Option<PathBuf>,
    /// Root directory for spilled large-content blobs.
    pub blob_root: PathBuf,
    /// Cap on a serialized event, e.g. "1 MB". Parsed with `parse_size`.
    pub max_memory_size: String,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// Number of read-only connections in the pool.
    pub read_pool_size: usize,
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub monitor: MonitorConfig,
    pub limiter: LimiterConfig,
}

impl Default for EngramConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::DEFAULT_DB_PATH.to_string(),
            vector_dir: None,
            blob_root: PathBuf::from(defaults::DEFAULT_BLOB_ROOT),
            max_memory_size: crate::constants::DEFAULT_MAX_MEMORY_SIZE.to_string(),
            busy_timeout_ms: defaults::DEFAULT_BUSY_TIMEOUT_MS,
            read_pool_size: defaults::DEFAULT_READ_POOL_SIZE,
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            monitor: MonitorConfig::default(),
            limiter: LimiterConfig::default(),
        }
    }
}

impl EngramConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Parse a TOML config file. Unknown keys are ignored; missing keys
    /// fall back to their defaults.
    pub fn from_file(path: &std::path::Path) -> EngramResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            crate::EngramError::validation("config", format!("read {}: {e}", path.display()))
        })?;
        toml::from_str(&text).map_err(|e| {
            crate::EngramError::validation("config", format!("parse {}: {e}", path.display()))
        })
    }

    /// The file config when a path is given (defaults otherwise), with
    /// environment overrides applied on top.
    pub fn load(path: Option<&std::path::Path>) -> EngramResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("MEMORY_DB_PATH") {
            if !path.is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(mode) = std::env::var("MONITORING_MODE") {
            self.monitor.simple_mode = mode.eq_ignore_ascii_case("simple");
        }
    }

    /// The configured event size cap in bytes.
    pub fn max_memory_size_bytes(&self) -> EngramResult<usize> {
        parse_size(&self.max_memory_size)
    }

    /// Whether the relational store is in-memory.
    pub fn is_in_memory(&self) -> bool {
        self.db_path == ":memory:"
    }
}
