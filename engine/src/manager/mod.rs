//! The orchestrator: owns the cache, the pool and the monitor, tracks
//! per-module statistics and turns them into reports.

mod error;
mod module;
mod report;

pub use error::ManagerError;
pub use module::ModulePerformance;
pub use report::{
  PerformanceReport, CACHE_HIT_RATE_FLOOR, MODULE_ERROR_RATE_CEILING, SLOW_MODULE_LATENCY,
};

use crate::config::EngineConfig;
use crate::monitor::{
  system, AlertSink, PerformanceAlert, PerformanceMetric, PerformanceMonitor, SystemMetrics,
  TracingAlertSink,
};
use crate::pool::{PoolMetrics, ResourcePool};
use crate::probe::{ProcessProbe, SysinfoProbe};
use crate::reclaim::ReclaimStats;

use ballast_cache::{EvictionableCache, MetricsSnapshot};

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

/// The value type of the manager's shared cache.
pub type CacheValue = serde_json::Value;

pub struct PerformanceManager {
  config: EngineConfig,
  cache: Option<EvictionableCache<CacheValue>>,
  pool: Option<ResourcePool>,
  monitor: Option<PerformanceMonitor>,
  modules: RwLock<HashMap<String, ModulePerformance>>,
  probe: Arc<dyn ProcessProbe>,
  reclaim: Arc<ReclaimStats>,
}

impl fmt::Debug for PerformanceManager {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PerformanceManager")
      .field("cache", &self.cache)
      .field("pool", &self.pool)
      .field("monitor", &self.monitor)
      .field("modules", &self.modules.read().len())
      .finish()
  }
}

impl PerformanceManager {
  /// Builds every enabled component from `config`.
  pub fn new(config: EngineConfig) -> Result<Self, ManagerError> {
    Self::with_parts(config, Arc::new(SysinfoProbe::new()), Arc::new(TracingAlertSink))
  }

  /// Builds every enabled component, sharing one process probe between the
  /// pool and the monitor and sending alerts to `sink`.
  pub fn with_parts(
    config: EngineConfig,
    probe: Arc<dyn ProcessProbe>,
    sink: Arc<dyn AlertSink>,
  ) -> Result<Self, ManagerError> {
    let reclaim = Arc::new(ReclaimStats::new());

    let cache = match &config.cache {
      Some(cache_config) => Some(
        EvictionableCache::new(cache_config.clone()).map_err(ballast_cache::CacheError::from)?,
      ),
      None => None,
    };
    let pool = match &config.pool {
      Some(pool_config) => Some(ResourcePool::with_probe(
        pool_config.clone(),
        probe.clone(),
        reclaim.clone(),
      )?),
      None => None,
    };
    let monitor = match &config.monitor {
      Some(monitor_config) => Some(PerformanceMonitor::with_parts(
        monitor_config.clone(),
        probe.clone(),
        reclaim.clone(),
        sink,
      )?),
      None => None,
    };

    tracing::info!(
      target: "ballast::manager",
      cache = cache.is_some(),
      pool = pool.is_some(),
      monitor = monitor.is_some(),
      "performance manager started"
    );

    Ok(Self {
      config,
      cache,
      pool,
      monitor,
      modules: RwLock::new(HashMap::new()),
      probe,
      reclaim,
    })
  }

  /// Records one request made by `module` and forwards its latency to the
  /// monitor as `<module>_request_time`, in milliseconds.
  pub fn record_module_performance(&self, module: &str, duration: Duration, success: bool) {
    {
      let mut modules = self.modules.write();
      modules
        .entry(module.to_string())
        .or_insert_with(|| ModulePerformance::new(module))
        .record_request(duration, success);
    }

    if let Some(monitor) = &self.monitor {
      monitor.record_metric(
        PerformanceMetric::new(
          format!("{}_request_time", module),
          duration.as_secs_f64() * 1000.0,
          "ms",
        )
        .tag("module", module)
        .tag("success", success.to_string()),
      );
    }
  }

  /// Counts a cache hit against `module`. Independent of the cache's own
  /// counters.
  pub fn record_cache_hit(&self, module: &str) {
    self
      .modules
      .write()
      .entry(module.to_string())
      .or_insert_with(|| ModulePerformance::new(module))
      .record_cache_hit();
  }

  /// Counts a cache miss against `module`. Independent of the cache's own
  /// counters.
  pub fn record_cache_miss(&self, module: &str) {
    self
      .modules
      .write()
      .entry(module.to_string())
      .or_insert_with(|| ModulePerformance::new(module))
      .record_cache_miss();
  }

  /// Names of every tracked module, sorted.
  pub fn list_modules(&self) -> Vec<String> {
    let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
    names.sort();
    names
  }

  pub fn module_performance(&self, module: &str) -> Option<ModulePerformance> {
    self.modules.read().get(module).cloned()
  }

  pub fn cache(&self) -> Option<&EvictionableCache<CacheValue>> {
    self.cache.as_ref()
  }

  pub fn pool(&self) -> Option<&ResourcePool> {
    self.pool.as_ref()
  }

  pub fn monitor(&self) -> Option<&PerformanceMonitor> {
    self.monitor.as_ref()
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn cache_metrics(&self) -> Option<MetricsSnapshot> {
    self.cache.as_ref().map(|cache| cache.metrics())
  }

  pub fn pool_metrics(&self) -> Option<PoolMetrics> {
    self.pool.as_ref().map(|pool| pool.metrics())
  }

  /// A system snapshot, taken directly when the monitor is disabled.
  pub fn system_metrics(&self) -> SystemMetrics {
    match &self.monitor {
      Some(monitor) => monitor.get_system_metrics(),
      None => {
        let runtime = tokio::runtime::Handle::try_current().ok();
        system::snapshot(self.probe.as_ref(), &self.reclaim, runtime.as_ref())
      }
    }
  }

  /// Alerts with the given resolved state; empty when the monitor is disabled.
  pub fn alerts(&self, resolved: bool) -> Vec<PerformanceAlert> {
    self
      .monitor
      .as_ref()
      .map(|monitor| monitor.get_alerts(resolved))
      .unwrap_or_default()
  }

  pub fn resolve_alert(&self, id: Uuid) -> Result<PerformanceAlert, ManagerError> {
    let monitor = self
      .monitor
      .as_ref()
      .ok_or(ManagerError::ComponentDisabled("monitor"))?;
    Ok(monitor.resolve_alert(id)?)
  }

  pub fn generate_report(&self) -> PerformanceReport {
    let system = self.system_metrics();
    let cache = self.cache_metrics();
    let pool = self.pool_metrics();

    let mut modules: Vec<ModulePerformance> = self.modules.read().values().cloned().collect();
    modules.sort_by(|a, b| a.name.cmp(&b.name));

    let recommendations = report::recommendations(
      cache.as_ref(),
      system.memory_bytes,
      self.pool.as_ref().map(|pool| pool.config().max_memory_bytes()),
      &modules,
    );

    tracing::debug!(
      target: "ballast::manager",
      modules = modules.len(),
      recommendations = recommendations.len(),
      "performance report generated"
    );

    PerformanceReport {
      generated_at: Utc::now(),
      system,
      alerts: self.alerts(false),
      cache,
      pool,
      modules,
      recommendations,
    }
  }

  /// Logs and returns rule-based suggestions for `module`. Nothing is applied.
  ///
  /// A module known only through cache hits and misses has no requests to
  /// judge and is reported as not found.
  pub fn optimize_module(&self, module: &str) -> Result<Vec<String>, ManagerError> {
    let stats = self
      .module_performance(module)
      .filter(|stats| stats.request_count > 0)
      .ok_or_else(|| ManagerError::ModuleNotFound(module.to_string()))?;

    let suggestions = report::module_suggestions(&stats);
    if suggestions.is_empty() {
      tracing::info!(target: "ballast::manager", module, "no optimizations suggested");
    }
    for suggestion in &suggestions {
      tracing::info!(target: "ballast::manager", module, "{}", suggestion);
    }
    Ok(suggestions)
  }

  /// Closes the cache, the pool and the monitor. Every component is closed
  /// even if an earlier one fails; the failures come back together.
  pub fn close(&self) -> Result<(), ManagerError> {
    let mut failures = Vec::new();

    if let Some(cache) = &self.cache {
      if let Err(e) = cache.close() {
        failures.push(ManagerError::Cache(e));
      }
    }
    if let Some(pool) = &self.pool {
      if let Err(e) = pool.close() {
        failures.push(ManagerError::Pool(e));
      }
    }
    if let Some(monitor) = &self.monitor {
      if let Err(e) = monitor.close() {
        failures.push(ManagerError::Monitor(e));
      }
    }

    if failures.is_empty() {
      tracing::info!(target: "ballast::manager", "performance manager closed");
      Ok(())
    } else {
      tracing::error!(target: "ballast::manager", failures = failures.len(), "performance manager closed with errors");
      Err(ManagerError::Close(failures))
    }
  }
}
