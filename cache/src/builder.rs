use crate::cache::EvictionableCache;
use crate::error::BuildError;
use crate::policy::EvictionStrategy;

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Default entry limit.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;
/// Default byte limit (100 MiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;
/// Default time-to-live for entries set without an explicit one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
/// Default interval between expiration sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Where and whether cache contents would be persisted.
///
/// Persistence is a hook only; enabling it makes `persist`/`restore` log
/// their intent without touching the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistenceConfig {
  pub enabled: bool,
  pub path: Option<PathBuf>,
}

/// Validated cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheConfig {
  pub strategy: EvictionStrategy,
  pub max_entries: usize,
  pub max_size_bytes: u64,
  pub default_ttl: Duration,
  pub cleanup_interval: Duration,
  pub enable_metrics: bool,
  pub persistence: PersistenceConfig,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      strategy: EvictionStrategy::default(),
      max_entries: DEFAULT_MAX_ENTRIES,
      max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
      default_ttl: DEFAULT_TTL,
      cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
      enable_metrics: true,
      persistence: PersistenceConfig::default(),
    }
  }
}

impl CacheConfig {
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.max_entries == 0 || self.max_size_bytes == 0 {
      return Err(BuildError::ZeroCapacity);
    }
    if self.cleanup_interval.is_zero() {
      return Err(BuildError::ZeroInterval);
    }
    Ok(())
  }
}

/// A builder for creating [`EvictionableCache`] instances.
#[derive(Debug, Clone, Default)]
pub struct CacheBuilder {
  config: CacheConfig,
}

impl CacheBuilder {
  /// Creates a new `CacheBuilder` with default settings.
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts from an existing configuration.
  pub fn from_config(config: CacheConfig) -> Self {
    Self { config }
  }

  /// Sets the eviction strategy.
  pub fn strategy(mut self, strategy: EvictionStrategy) -> Self {
    self.config.strategy = strategy;
    self
  }

  /// Sets the maximum number of live entries.
  pub fn max_entries(mut self, max_entries: usize) -> Self {
    self.config.max_entries = max_entries;
    self
  }

  /// Sets the maximum total serialized size, in bytes.
  pub fn max_size_bytes(mut self, max_size_bytes: u64) -> Self {
    self.config.max_size_bytes = max_size_bytes;
    self
  }

  /// Sets the TTL used when `set` is not given one.
  pub fn default_ttl(mut self, ttl: Duration) -> Self {
    self.config.default_ttl = ttl;
    self
  }

  /// Sets the interval of the background expiration sweep.
  pub fn cleanup_interval(mut self, interval: Duration) -> Self {
    self.config.cleanup_interval = interval;
    self
  }

  /// Turns hit/miss accounting on or off.
  pub fn enable_metrics(mut self, enabled: bool) -> Self {
    self.config.enable_metrics = enabled;
    self
  }

  pub fn persistence(mut self, persistence: PersistenceConfig) -> Self {
    self.config.persistence = persistence;
    self
  }

  pub fn config(&self) -> &CacheConfig {
    &self.config
  }

  /// Validates the configuration, then builds the cache and starts its sweeper.
  pub fn build<V>(self) -> Result<EvictionableCache<V>, BuildError>
  where
    V: serde::Serialize + Send + Sync + 'static,
  {
    EvictionableCache::new(self.config)
  }
}
