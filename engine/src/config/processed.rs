use super::raw::{
  CacheConfigRaw, EngineConfigRaw, LoggingConfigRaw, MonitorConfigRaw, PoolConfigRaw,
  ResourceTypeConfigRaw,
};
use super::{ConfigError, EngineConfig, Result};
use crate::logging::LoggingConfig;
use crate::monitor::{MonitorConfig, PerformanceThreshold};
use crate::pool::{PoolConfig, ResourceType, ResourceTypeConfig};

use ballast_cache::{CacheConfig, EvictionStrategy, PersistenceConfig};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Processes the raw, deserialized configuration into a validated `EngineConfig`.
pub fn process_raw_config(raw: EngineConfigRaw) -> Result<EngineConfig> {
  Ok(EngineConfig {
    logging: process_logging(raw.logging)?,
    cache: process_cache(raw.cache)?,
    pool: process_pool(raw.pool)?,
    monitor: process_monitor(raw.monitor)?,
  })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
  ConfigError::InvalidConfigValue {
    field: field.into(),
    message: message.into(),
  }
}

fn parse_duration(field: &str, value: Option<String>, default: Duration) -> Result<Duration> {
  match value {
    None => Ok(default),
    Some(text) => humantime::parse_duration(text.trim()).map_err(|e| {
      invalid(
        field,
        format!("'{}' is not a duration ({}). Expected e.g. '30s', '5m' or '1h'.", text, e),
      )
    }),
  }
}

fn non_zero_duration(field: &str, value: Option<String>, default: Duration) -> Result<Duration> {
  let duration = parse_duration(field, value, default)?;
  if duration.is_zero() {
    return Err(invalid(field, "must be greater than zero"));
  }
  Ok(duration)
}

fn process_logging(raw: LoggingConfigRaw) -> Result<LoggingConfig> {
  let defaults = LoggingConfig::default();
  let filter = raw.filter.unwrap_or(defaults.filter);
  if let Err(e) = EnvFilter::try_new(&filter) {
    return Err(invalid("logging.filter", format!("'{}' is not a valid filter: {}", filter, e)));
  }
  Ok(LoggingConfig {
    filter,
    json: raw.json.unwrap_or(defaults.json),
    ansi: raw.ansi.unwrap_or(defaults.ansi),
  })
}

fn process_cache(raw: CacheConfigRaw) -> Result<Option<CacheConfig>> {
  if !raw.enabled.unwrap_or(true) {
    return Ok(None);
  }
  let defaults = CacheConfig::default();

  let strategy = match raw.strategy {
    Some(text) => text
      .parse::<EvictionStrategy>()
      .map_err(|message| invalid("cache.strategy", message))?,
    None => defaults.strategy,
  };

  let max_entries = raw.max_entries.unwrap_or(defaults.max_entries);
  if max_entries == 0 {
    return Err(invalid("cache.max_entries", "must be greater than zero"));
  }
  let max_size_bytes = raw.max_size_bytes.unwrap_or(defaults.max_size_bytes);
  if max_size_bytes == 0 {
    return Err(invalid("cache.max_size_bytes", "must be greater than zero"));
  }

  if raw.persistence.enabled && raw.persistence.path.as_deref().map_or(true, str::is_empty) {
    return Err(invalid(
      "cache.persistence.path",
      "a path is required when persistence is enabled",
    ));
  }

  Ok(Some(CacheConfig {
    strategy,
    max_entries,
    max_size_bytes,
    default_ttl: parse_duration("cache.default_ttl", raw.default_ttl, defaults.default_ttl)?,
    cleanup_interval: non_zero_duration(
      "cache.cleanup_interval",
      raw.cleanup_interval,
      defaults.cleanup_interval,
    )?,
    enable_metrics: raw.enable_metrics.unwrap_or(defaults.enable_metrics),
    persistence: PersistenceConfig {
      enabled: raw.persistence.enabled,
      path: raw.persistence.path.map(PathBuf::from),
    },
  }))
}

fn process_resource_type(
  name: &str,
  raw: ResourceTypeConfigRaw,
  pool_idle_timeout: Duration,
) -> Result<(ResourceType, ResourceTypeConfig)> {
  let field = |suffix: &str| format!("pool.resource_types.{}.{}", name, suffix);

  let kind = name
    .parse::<ResourceType>()
    .map_err(|message| invalid(format!("pool.resource_types.{}", name), message))?;

  let mut config = ResourceTypeConfig::new(raw.max_size).idle_timeout(parse_duration(
    &field("idle_timeout"),
    raw.idle_timeout,
    pool_idle_timeout,
  )?);
  if let Some(text) = raw.acquire_timeout {
    config = config.acquire_timeout(non_zero_duration(
      &field("acquire_timeout"),
      Some(text),
      Duration::ZERO,
    )?);
  }
  Ok((kind, config))
}

fn process_pool(raw: PoolConfigRaw) -> Result<Option<PoolConfig>> {
  if !raw.enabled.unwrap_or(true) {
    return Ok(None);
  }
  let defaults = PoolConfig::default();

  let idle_timeout = parse_duration("pool.idle_timeout", raw.idle_timeout, defaults.idle_timeout)?;

  let resource_types = match raw.resource_types {
    Some(raw_types) => {
      let mut types = BTreeMap::new();
      for (name, raw_type) in raw_types {
        let (kind, config) = process_resource_type(&name, raw_type, idle_timeout)?;
        if types.insert(kind, config).is_some() {
          return Err(invalid(
            format!("pool.resource_types.{}", name),
            format!("resource type '{}' is configured more than once", kind),
          ));
        }
      }
      types
    }
    None => defaults
      .resource_types
      .into_iter()
      .map(|(kind, config)| (kind, config.idle_timeout(idle_timeout)))
      .collect(),
  };

  let config = PoolConfig {
    max_total_resources: raw
      .max_total_resources
      .unwrap_or(defaults.max_total_resources),
    max_memory_mb: raw.max_memory_mb.unwrap_or(defaults.max_memory_mb),
    cleanup_interval: parse_duration(
      "pool.cleanup_interval",
      raw.cleanup_interval,
      defaults.cleanup_interval,
    )?,
    idle_timeout,
    acquire_timeout: non_zero_duration(
      "pool.acquire_timeout",
      raw.acquire_timeout,
      defaults.acquire_timeout,
    )?,
    resource_types,
  };
  config.validate()?;
  Ok(Some(config))
}

fn process_monitor(raw: MonitorConfigRaw) -> Result<Option<MonitorConfig>> {
  if !raw.enabled.unwrap_or(true) {
    return Ok(None);
  }
  let defaults = MonitorConfig::default();

  let thresholds = match raw.thresholds {
    Some(raw_thresholds) => raw_thresholds
      .into_iter()
      .map(|t| PerformanceThreshold::new(t.metric_name, t.warning, t.critical, t.unit))
      .collect(),
    None => defaults.thresholds,
  };

  let config = MonitorConfig {
    sampling_interval: parse_duration(
      "monitor.sampling_interval",
      raw.sampling_interval,
      defaults.sampling_interval,
    )?,
    retention_period: parse_duration(
      "monitor.retention_period",
      raw.retention_period,
      defaults.retention_period,
    )?,
    retention_sweep_interval: parse_duration(
      "monitor.retention_sweep_interval",
      raw.retention_sweep_interval,
      defaults.retention_sweep_interval,
    )?,
    max_metrics: raw.max_metrics.unwrap_or(defaults.max_metrics),
    enable_alerting: raw.enable_alerting.unwrap_or(defaults.enable_alerting),
    alert_queue_capacity: raw
      .alert_queue_capacity
      .unwrap_or(defaults.alert_queue_capacity),
    dedupe_alerts: raw.dedupe_alerts.unwrap_or(defaults.dedupe_alerts),
    thresholds,
  };
  config.validate()?;
  Ok(Some(config))
}
