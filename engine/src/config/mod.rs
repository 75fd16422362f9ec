//! Engine configuration.
//!
//! Loading is two-staged: YAML is deserialized into the loosely typed
//! structs in [`raw`], then [`processed::process_raw_config`] validates it
//! and fills in defaults to produce an [`EngineConfig`].

pub mod processed;
pub mod raw;

pub use processed::process_raw_config;

use crate::logging::LoggingConfig;
use crate::monitor::MonitorConfig;
use crate::pool::PoolConfig;

use ballast_cache::CacheConfig;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read configuration file {path:?}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("Failed to parse configuration: {0}")]
  Parse(String),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidConfigValue { field: String, message: String },
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// The single configuration object every component is built from.
///
/// A `None` component is disabled. Resource factories and cleanup callbacks
/// cannot be expressed in YAML; attach them to `pool` after loading.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  pub logging: LoggingConfig,
  pub cache: Option<CacheConfig>,
  pub pool: Option<PoolConfig>,
  pub monitor: Option<MonitorConfig>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      logging: LoggingConfig::default(),
      cache: Some(CacheConfig::default()),
      pool: Some(PoolConfig::default()),
      monitor: Some(MonitorConfig::default()),
    }
  }
}

impl EngineConfig {
  pub fn from_yaml_str(yaml: &str) -> Result<Self> {
    let raw: raw::EngineConfigRaw =
      serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
    process_raw_config(raw)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_yaml_str(&text)
  }

  /// Replaces the pool section through `f`, if the pool is enabled.
  pub fn map_pool(mut self, f: impl FnOnce(PoolConfig) -> PoolConfig) -> Self {
    self.pool = self.pool.map(f);
    self
  }
}
