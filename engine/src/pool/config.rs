use super::resource::{Resource, ResourceCleanup, ResourceFactory, ResourceHandle, ResourceType};
use crate::config::ConfigError;
use crate::error::BoxError;

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Default cap on live resources across all types.
pub const DEFAULT_MAX_TOTAL_RESOURCES: usize = 100;
/// Default process memory ceiling, in megabytes.
pub const DEFAULT_MAX_MEMORY_MB: u64 = 1024;
/// Default interval of the idle reaper and the memory watchdog.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(30);
/// Default idle timeout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default bound on how long `acquire` waits in the queue.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default per-type capacity for types configured without one.
pub const DEFAULT_TYPE_MAX_SIZE: usize = 10;

/// Settings for one resource type.
#[derive(Clone)]
pub struct ResourceTypeConfig {
  pub max_size: usize,
  pub idle_timeout: Duration,
  /// Overrides the pool-wide acquire timeout for this type.
  pub acquire_timeout: Option<Duration>,
  pub factory: Option<ResourceFactory>,
  pub cleanup: Option<ResourceCleanup>,
}

impl fmt::Debug for ResourceTypeConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResourceTypeConfig")
      .field("max_size", &self.max_size)
      .field("idle_timeout", &self.idle_timeout)
      .field("acquire_timeout", &self.acquire_timeout)
      .field("has_factory", &self.factory.is_some())
      .field("has_cleanup", &self.cleanup.is_some())
      .finish()
  }
}

impl Default for ResourceTypeConfig {
  fn default() -> Self {
    Self::new(DEFAULT_TYPE_MAX_SIZE)
  }
}

impl ResourceTypeConfig {
  pub fn new(max_size: usize) -> Self {
    Self {
      max_size,
      idle_timeout: DEFAULT_IDLE_TIMEOUT,
      acquire_timeout: None,
      factory: None,
      cleanup: None,
    }
  }

  pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
    self.idle_timeout = idle_timeout;
    self
  }

  pub fn acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
    self.acquire_timeout = Some(acquire_timeout);
    self
  }

  /// Sets the callback that builds each new resource's handle.
  pub fn factory<F>(mut self, factory: F) -> Self
  where
    F: Fn(ResourceType) -> Result<ResourceHandle, BoxError> + Send + Sync + 'static,
  {
    self.factory = Some(Arc::new(factory));
    self
  }

  /// Sets the callback run whenever the pool destroys a resource.
  pub fn cleanup<F>(mut self, cleanup: F) -> Self
  where
    F: Fn(&Resource) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    self.cleanup = Some(Arc::new(cleanup));
    self
  }
}

/// Validated pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
  pub max_total_resources: usize,
  pub max_memory_mb: u64,
  pub cleanup_interval: Duration,
  /// Idle timeout for types that do not set their own.
  pub idle_timeout: Duration,
  pub acquire_timeout: Duration,
  pub resource_types: BTreeMap<ResourceType, ResourceTypeConfig>,
}

impl Default for PoolConfig {
  fn default() -> Self {
    let resource_types = [
      (ResourceType::Database, 20),
      (ResourceType::Cache, 10),
      (ResourceType::Http, 50),
      (ResourceType::File, 10),
      (ResourceType::Memory, 10),
      (ResourceType::BackgroundTask, 10),
    ]
    .into_iter()
    .map(|(kind, max_size)| (kind, ResourceTypeConfig::new(max_size)))
    .collect();

    Self {
      max_total_resources: DEFAULT_MAX_TOTAL_RESOURCES,
      max_memory_mb: DEFAULT_MAX_MEMORY_MB,
      cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
      idle_timeout: DEFAULT_IDLE_TIMEOUT,
      acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
      resource_types,
    }
  }
}

impl PoolConfig {
  /// A configuration with pool-wide defaults and no resource types.
  pub fn empty() -> Self {
    Self {
      resource_types: BTreeMap::new(),
      ..Self::default()
    }
  }

  pub fn with_resource_type(mut self, kind: ResourceType, config: ResourceTypeConfig) -> Self {
    self.resource_types.insert(kind, config);
    self
  }

  /// Attaches a factory to `kind`, configuring the type with defaults if it
  /// was not configured yet.
  pub fn with_factory<F>(mut self, kind: ResourceType, factory: F) -> Self
  where
    F: Fn(ResourceType) -> Result<ResourceHandle, BoxError> + Send + Sync + 'static,
  {
    let idle_timeout = self.idle_timeout;
    let entry = self
      .resource_types
      .entry(kind)
      .or_insert_with(|| ResourceTypeConfig::default().idle_timeout(idle_timeout));
    entry.factory = Some(Arc::new(factory));
    self
  }

  /// Attaches a cleanup callback to `kind`, configuring the type with
  /// defaults if it was not configured yet.
  pub fn with_cleanup<F>(mut self, kind: ResourceType, cleanup: F) -> Self
  where
    F: Fn(&Resource) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    let idle_timeout = self.idle_timeout;
    let entry = self
      .resource_types
      .entry(kind)
      .or_insert_with(|| ResourceTypeConfig::default().idle_timeout(idle_timeout));
    entry.cleanup = Some(Arc::new(cleanup));
    self
  }

  pub fn max_memory_bytes(&self) -> u64 {
    self.max_memory_mb.saturating_mul(1024 * 1024)
  }

  /// Acquire timeout for `kind`, falling back to the pool-wide one.
  pub fn acquire_timeout_for(&self, kind: ResourceType) -> Duration {
    self
      .resource_types
      .get(&kind)
      .and_then(|config| config.acquire_timeout)
      .unwrap_or(self.acquire_timeout)
  }

  pub(crate) fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |field: String, message: &str| ConfigError::InvalidConfigValue {
      field,
      message: message.to_string(),
    };

    if self.max_total_resources == 0 {
      return Err(invalid("pool.max_total_resources".into(), "must be greater than zero"));
    }
    if self.max_memory_mb == 0 {
      return Err(invalid("pool.max_memory_mb".into(), "must be greater than zero"));
    }
    if self.cleanup_interval.is_zero() {
      return Err(invalid("pool.cleanup_interval".into(), "must be greater than zero"));
    }
    for (kind, config) in &self.resource_types {
      if config.max_size == 0 {
        return Err(invalid(
          format!("pool.resource_types.{}.max_size", kind),
          "must be greater than zero",
        ));
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_configures_every_type() {
    let config = PoolConfig::default();
    assert_eq!(config.resource_types.len(), ResourceType::ALL.len());
    assert_eq!(config.max_total_resources, 100);
    assert_eq!(config.max_memory_bytes(), 1024 * 1024 * 1024);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn per_type_acquire_timeout_overrides_pool_default() {
    let config = PoolConfig::empty().with_resource_type(
      ResourceType::Http,
      ResourceTypeConfig::new(2).acquire_timeout(Duration::from_secs(1)),
    );
    assert_eq!(config.acquire_timeout_for(ResourceType::Http), Duration::from_secs(1));
    assert_eq!(config.acquire_timeout_for(ResourceType::File), DEFAULT_ACQUIRE_TIMEOUT);
  }

  #[test]
  fn with_factory_configures_missing_type() {
    let config = PoolConfig::empty().with_factory(ResourceType::File, |_| Ok(Arc::new(())));
    let file = &config.resource_types[&ResourceType::File];
    assert_eq!(file.max_size, DEFAULT_TYPE_MAX_SIZE);
    assert!(file.factory.is_some());
  }

  #[test]
  fn zero_type_capacity_is_rejected() {
    let config = PoolConfig::empty().with_resource_type(ResourceType::Cache, ResourceTypeConfig::new(0));
    match config.validate() {
      Err(ConfigError::InvalidConfigValue { field, .. }) => {
        assert_eq!(field, "pool.resource_types.cache.max_size")
      }
      other => panic!("unexpected: {:?}", other),
    }
  }
}
