// Structs mapping directly onto the YAML configuration. Durations are
// humantime strings ("30s", "5m", "1h 30m") and stay strings until processed.

use serde::Deserialize;
use std::collections::BTreeMap;

// --- Top Level Config ---
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigRaw {
  #[serde(default)]
  pub logging: LoggingConfigRaw,
  #[serde(default)]
  pub cache: CacheConfigRaw,
  #[serde(default)]
  pub pool: PoolConfigRaw,
  #[serde(default)]
  pub monitor: MonitorConfigRaw,
}

// --- Logging ---
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfigRaw {
  /// An `EnvFilter` directive, e.g. "info,ballast::pool=debug".
  pub filter: Option<String>,
  pub json: Option<bool>,
  pub ansi: Option<bool>,
}

// --- Cache ---
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CacheConfigRaw {
  pub enabled: Option<bool>,
  /// "lru", "lfu" or "ttl".
  pub strategy: Option<String>,
  pub max_entries: Option<usize>,
  pub max_size_bytes: Option<u64>,
  pub default_ttl: Option<String>,
  pub cleanup_interval: Option<String>,
  pub enable_metrics: Option<bool>,
  #[serde(default)]
  pub persistence: PersistenceConfigRaw,
}

#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PersistenceConfigRaw {
  #[serde(default)]
  pub enabled: bool,
  pub path: Option<String>,
}

// --- Pool ---
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PoolConfigRaw {
  pub enabled: Option<bool>,
  pub max_total_resources: Option<usize>,
  pub max_memory_mb: Option<u64>,
  pub cleanup_interval: Option<String>,
  pub idle_timeout: Option<String>,
  pub acquire_timeout: Option<String>,
  /// When present, replaces the default set of resource types entirely.
  pub resource_types: Option<BTreeMap<String, ResourceTypeConfigRaw>>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResourceTypeConfigRaw {
  pub max_size: usize,
  pub idle_timeout: Option<String>,
  pub acquire_timeout: Option<String>,
}

// --- Monitor ---
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfigRaw {
  pub enabled: Option<bool>,
  pub sampling_interval: Option<String>,
  pub retention_period: Option<String>,
  pub retention_sweep_interval: Option<String>,
  pub max_metrics: Option<usize>,
  pub enable_alerting: Option<bool>,
  pub alert_queue_capacity: Option<usize>,
  pub dedupe_alerts: Option<bool>,
  /// When present, replaces the default thresholds entirely.
  pub thresholds: Option<Vec<ThresholdConfigRaw>>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfigRaw {
  pub metric_name: String,
  pub warning: f64,
  pub critical: f64,
  #[serde(default)]
  pub unit: String,
}
