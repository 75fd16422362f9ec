use super::types::PerformanceThreshold;
use crate::config::ConfigError;

use std::time::Duration;

/// Default interval of the self-sampler.
pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_secs(30);
/// Default retention window for samples and resolved alerts.
pub const DEFAULT_RETENTION_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);
/// Default interval of the retention sweep.
pub const DEFAULT_RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default cap on samples kept per metric name.
pub const DEFAULT_MAX_METRICS: usize = 10_000;
/// Default capacity of the alert dispatch queue.
pub const DEFAULT_ALERT_QUEUE_CAPACITY: usize = 100;

/// Validated monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
  pub sampling_interval: Duration,
  pub retention_period: Duration,
  pub retention_sweep_interval: Duration,
  pub max_metrics: usize,
  pub enable_alerting: bool,
  pub alert_queue_capacity: usize,
  /// When set, a crossing does not raise a new alert while an unresolved one
  /// of the same metric and severity exists.
  pub dedupe_alerts: bool,
  pub thresholds: Vec<PerformanceThreshold>,
}

impl Default for MonitorConfig {
  fn default() -> Self {
    Self {
      sampling_interval: DEFAULT_SAMPLING_INTERVAL,
      retention_period: DEFAULT_RETENTION_PERIOD,
      retention_sweep_interval: DEFAULT_RETENTION_SWEEP_INTERVAL,
      max_metrics: DEFAULT_MAX_METRICS,
      enable_alerting: true,
      alert_queue_capacity: DEFAULT_ALERT_QUEUE_CAPACITY,
      dedupe_alerts: true,
      thresholds: vec![
        PerformanceThreshold::new(super::system::CPU_PERCENT, 70.0, 90.0, "percent"),
        PerformanceThreshold::new(
          super::system::MEMORY_BYTES,
          768.0 * 1024.0 * 1024.0,
          1024.0 * 1024.0 * 1024.0,
          "bytes",
        ),
      ],
    }
  }
}

impl MonitorConfig {
  pub(crate) fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |field: &str, message: &str| ConfigError::InvalidConfigValue {
      field: field.to_string(),
      message: message.to_string(),
    };

    if self.sampling_interval.is_zero() {
      return Err(invalid("monitor.sampling_interval", "must be greater than zero"));
    }
    if self.retention_period.is_zero() {
      return Err(invalid("monitor.retention_period", "must be greater than zero"));
    }
    if self.retention_sweep_interval.is_zero() {
      return Err(invalid("monitor.retention_sweep_interval", "must be greater than zero"));
    }
    if self.max_metrics == 0 {
      return Err(invalid("monitor.max_metrics", "must be greater than zero"));
    }
    if self.alert_queue_capacity == 0 {
      return Err(invalid("monitor.alert_queue_capacity", "must be greater than zero"));
    }
    for (index, threshold) in self.thresholds.iter().enumerate() {
      if let Some(reason) = threshold.invalid_reason() {
        return Err(invalid(&format!("monitor.thresholds[{}]", index), reason));
      }
    }
    Ok(())
  }
}
