use core::fmt;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One sample of a named series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
  pub name: String,
  pub value: f64,
  pub unit: String,
  pub timestamp: DateTime<Utc>,
  #[serde(default)]
  pub tags: HashMap<String, String>,
}

impl PerformanceMetric {
  /// A sample taken now.
  pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value,
      unit: unit.into(),
      timestamp: Utc::now(),
      tags: HashMap::new(),
    }
  }

  pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
    self.timestamp = timestamp;
    self
  }

  pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.tags.insert(key.into(), value.into());
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
  Info,
  Warning,
  Critical,
}

impl fmt::Display for AlertSeverity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      AlertSeverity::Info => "info",
      AlertSeverity::Warning => "warning",
      AlertSeverity::Critical => "critical",
    })
  }
}

/// Warning and critical breakpoints for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThreshold {
  pub metric_name: String,
  pub warning: f64,
  pub critical: f64,
  pub unit: String,
}

impl PerformanceThreshold {
  pub fn new(metric_name: impl Into<String>, warning: f64, critical: f64, unit: impl Into<String>) -> Self {
    Self {
      metric_name: metric_name.into(),
      warning,
      critical,
      unit: unit.into(),
    }
  }

  /// The severity `value` reaches and the level it crossed, if any.
  pub fn evaluate(&self, value: f64) -> Option<(AlertSeverity, f64)> {
    if value >= self.critical {
      Some((AlertSeverity::Critical, self.critical))
    } else if value >= self.warning {
      Some((AlertSeverity::Warning, self.warning))
    } else {
      None
    }
  }

  /// Why this threshold cannot be used, if it cannot.
  pub fn invalid_reason(&self) -> Option<&'static str> {
    if self.metric_name.trim().is_empty() {
      Some("metric name cannot be empty")
    } else if !self.warning.is_finite() || !self.critical.is_finite() {
      Some("levels must be finite numbers")
    } else if self.warning >= self.critical {
      Some("warning level must be below critical level")
    } else {
      None
    }
  }
}

/// A threshold crossing. Stays unresolved until resolved explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
  pub id: Uuid,
  pub metric_name: String,
  pub severity: AlertSeverity,
  pub message: String,
  pub threshold: f64,
  pub value: f64,
  pub timestamp: DateTime<Utc>,
  pub resolved: bool,
  pub resolved_at: Option<DateTime<Utc>>,
}

impl PerformanceAlert {
  pub(crate) fn new(
    metric_name: &str,
    severity: AlertSeverity,
    threshold: f64,
    value: f64,
    unit: &str,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      metric_name: metric_name.to_string(),
      severity,
      message: format!(
        "{} is {}{}, at or above the {} threshold of {}{}",
        metric_name, value, unit, severity, threshold, unit
      ),
      threshold,
      value,
      timestamp: Utc::now(),
      resolved: false,
      resolved_at: None,
    }
  }
}

/// A point-in-time reading of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
  pub timestamp: DateTime<Utc>,
  pub cpu_percent: f64,
  pub memory_bytes: u64,
  /// Live tokio tasks, or 0 outside a runtime.
  pub concurrency: usize,
  pub heap_bytes: u64,
  /// Memory-pressure reclaims run by the pool.
  pub reclaim_count: u64,
  pub last_reclaim: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_bands() {
    let threshold = PerformanceThreshold::new("latency", 100.0, 200.0, "ms");
    assert_eq!(threshold.evaluate(99.9), None);
    assert_eq!(threshold.evaluate(100.0), Some((AlertSeverity::Warning, 100.0)));
    assert_eq!(threshold.evaluate(199.0), Some((AlertSeverity::Warning, 100.0)));
    assert_eq!(threshold.evaluate(200.0), Some((AlertSeverity::Critical, 200.0)));
  }

  #[test]
  fn inverted_threshold_is_invalid() {
    assert!(PerformanceThreshold::new("x", 5.0, 1.0, "").invalid_reason().is_some());
    assert!(PerformanceThreshold::new("", 1.0, 5.0, "").invalid_reason().is_some());
    assert!(PerformanceThreshold::new("x", 1.0, 5.0, "").invalid_reason().is_none());
  }

  #[test]
  fn alert_message_names_the_crossing() {
    let alert = PerformanceAlert::new("latency", AlertSeverity::Critical, 200.0, 250.0, "ms");
    assert_eq!(
      alert.message,
      "latency is 250ms, at or above the critical threshold of 200ms"
    );
    assert!(!alert.resolved);
  }
}
