use super::module::ModulePerformance;
use crate::monitor::{PerformanceAlert, SystemMetrics};
use crate::pool::PoolMetrics;

use ballast_cache::MetricsSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Below this cache hit rate the report suggests cache tuning.
pub const CACHE_HIT_RATE_FLOOR: f64 = 0.8;
/// Modules averaging more than this are flagged as slow.
pub const SLOW_MODULE_LATENCY: Duration = Duration::from_millis(100);
/// Modules failing more often than this are flagged.
pub const MODULE_ERROR_RATE_CEILING: f64 = 0.05;

/// Everything the manager knows, plus what it suggests doing about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
  pub generated_at: DateTime<Utc>,
  pub system: SystemMetrics,
  /// Unresolved alerts.
  pub alerts: Vec<PerformanceAlert>,
  pub cache: Option<MetricsSnapshot>,
  pub pool: Option<PoolMetrics>,
  /// Sorted by module name.
  pub modules: Vec<ModulePerformance>,
  pub recommendations: Vec<String>,
}

/// The fixed rule set behind a report's recommendations.
pub(crate) fn recommendations(
  cache: Option<&MetricsSnapshot>,
  memory_bytes: u64,
  memory_ceiling_bytes: Option<u64>,
  modules: &[ModulePerformance],
) -> Vec<String> {
  let mut out = Vec::new();

  if let Some(cache) = cache {
    if cache.hits + cache.misses > 0 && cache.hit_rate < CACHE_HIT_RATE_FLOOR {
      out.push(format!(
        "Cache hit rate is {:.1}%; consider a larger cache or better cache keys.",
        cache.hit_rate * 100.0
      ));
    }
  }

  if let Some(ceiling) = memory_ceiling_bytes {
    if memory_bytes > ceiling {
      out.push(format!(
        "Memory usage is {} MB, above the configured {} MB; consider reducing allocations or pool sizes.",
        memory_bytes / (1024 * 1024),
        ceiling / (1024 * 1024)
      ));
    }
  }

  for module in modules {
    if module.average_latency > SLOW_MODULE_LATENCY {
      out.push(format!(
        "Module '{}' averages {:.1} ms per request; investigate its slow paths.",
        module.name,
        module.average_latency.as_secs_f64() * 1000.0
      ));
    }
    if module.error_rate() > MODULE_ERROR_RATE_CEILING {
      out.push(format!(
        "Module '{}' fails {:.1}% of requests; investigate its errors.",
        module.name,
        module.error_rate() * 100.0
      ));
    }
  }

  out
}

/// Suggestions for a single module.
pub(crate) fn module_suggestions(module: &ModulePerformance) -> Vec<String> {
  let mut out = Vec::new();

  if module.average_latency > SLOW_MODULE_LATENCY {
    out.push(format!(
      "Average latency of {:.1} ms exceeds {} ms; profile hot paths and cache repeated work.",
      module.average_latency.as_secs_f64() * 1000.0,
      SLOW_MODULE_LATENCY.as_millis()
    ));
  }
  if module.error_rate() > MODULE_ERROR_RATE_CEILING {
    out.push(format!(
      "Error rate of {:.1}% exceeds {:.0}%; add retries or fix failing dependencies.",
      module.error_rate() * 100.0,
      MODULE_ERROR_RATE_CEILING * 100.0
    ));
  }
  if let Some(hit_rate) = module.cache_hit_rate() {
    if hit_rate < CACHE_HIT_RATE_FLOOR {
      out.push(format!(
        "Cache hit rate of {:.1}% is low; review cache keys and TTLs for this module.",
        hit_rate * 100.0
      ));
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn module(name: &str, latency_ms: u64, failures: u64, requests: u64) -> ModulePerformance {
    let mut module = ModulePerformance::new(name);
    for i in 0..requests {
      module.record_request(Duration::from_millis(latency_ms), i >= failures);
    }
    module
  }

  #[test]
  fn healthy_modules_get_no_recommendations() {
    let modules = vec![module("fast", 5, 0, 100)];
    assert!(recommendations(None, 0, Some(1), &modules).is_empty());
  }

  #[test]
  fn slow_and_failing_modules_are_flagged() {
    let modules = vec![module("slow", 150, 0, 10), module("flaky", 5, 2, 10)];
    let out = recommendations(None, 0, None, &modules);
    assert_eq!(out.len(), 2);
    assert!(out[0].contains("'slow'"));
    assert!(out[1].contains("'flaky'"));
  }

  #[test]
  fn memory_over_ceiling_is_flagged() {
    let out = recommendations(None, 3 * 1024 * 1024, Some(2 * 1024 * 1024), &[]);
    assert_eq!(out.len(), 1);
    assert!(out[0].contains("3 MB"));
  }

  #[test]
  fn module_suggestions_cover_each_rule() {
    let mut m = module("m", 200, 1, 4);
    m.record_cache_miss();
    let out = module_suggestions(&m);
    assert_eq!(out.len(), 3);
  }
}
