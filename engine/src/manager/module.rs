use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Aggregate statistics for one caller-identified module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModulePerformance {
  pub name: String,
  pub request_count: u64,
  pub error_count: u64,
  #[serde(rename = "total_latency_ms", serialize_with = "as_millis")]
  pub total_latency: Duration,
  /// Cumulative mean over every recorded request.
  #[serde(rename = "average_latency_ms", serialize_with = "as_millis")]
  pub average_latency: Duration,
  pub cache_hits: u64,
  pub cache_misses: u64,
  pub last_updated: DateTime<Utc>,
}

impl ModulePerformance {
  pub(crate) fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      request_count: 0,
      error_count: 0,
      total_latency: Duration::ZERO,
      average_latency: Duration::ZERO,
      cache_hits: 0,
      cache_misses: 0,
      last_updated: Utc::now(),
    }
  }

  pub(crate) fn record_request(&mut self, duration: Duration, success: bool) {
    self.request_count += 1;
    if !success {
      self.error_count += 1;
    }
    self.total_latency = self.total_latency.saturating_add(duration);
    let mean_nanos = self.total_latency.as_nanos() / u128::from(self.request_count);
    self.average_latency = Duration::from_nanos(u64::try_from(mean_nanos).unwrap_or(u64::MAX));
    self.last_updated = Utc::now();
  }

  pub(crate) fn record_cache_hit(&mut self) {
    self.cache_hits += 1;
    self.last_updated = Utc::now();
  }

  pub(crate) fn record_cache_miss(&mut self) {
    self.cache_misses += 1;
    self.last_updated = Utc::now();
  }

  /// Failed requests over all requests; 0 without traffic.
  pub fn error_rate(&self) -> f64 {
    if self.request_count == 0 {
      0.0
    } else {
      self.error_count as f64 / self.request_count as f64
    }
  }

  /// Module cache hits over module cache lookups; `None` without lookups.
  pub fn cache_hit_rate(&self) -> Option<f64> {
    let lookups = self.cache_hits + self.cache_misses;
    (lookups > 0).then(|| self.cache_hits as f64 / lookups as f64)
  }
}
