//! Time-series metrics with threshold alerting.

mod alerts;
mod config;
mod error;
mod series;
pub mod system;
mod types;

pub use alerts::{AlertSink, TracingAlertSink};
pub use config::{
  MonitorConfig, DEFAULT_ALERT_QUEUE_CAPACITY, DEFAULT_MAX_METRICS, DEFAULT_RETENTION_PERIOD,
  DEFAULT_RETENTION_SWEEP_INTERVAL, DEFAULT_SAMPLING_INTERVAL,
};
pub use error::MonitorError;
pub use types::{AlertSeverity, PerformanceAlert, PerformanceMetric, PerformanceThreshold, SystemMetrics};

use alerts::AlertDispatcher;
use series::{retention_cutoff, MetricSeries};

use crate::probe::{ProcessProbe, SysinfoProbe};
use crate::reclaim::ReclaimStats;

use ballast_cache::PeriodicWorker;

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MonitorState {
  series: HashMap<String, MetricSeries>,
  thresholds: HashMap<String, PerformanceThreshold>,
  /// In creation order.
  alerts: Vec<PerformanceAlert>,
}

struct MonitorInner {
  config: MonitorConfig,
  state: RwLock<MonitorState>,
  dispatcher: Option<AlertDispatcher>,
  probe: Arc<dyn ProcessProbe>,
  reclaim: Arc<ReclaimStats>,
  runtime: Option<Handle>,
}

/// Records metric samples, raises alerts on threshold crossings and samples
/// the process on an interval.
pub struct PerformanceMonitor {
  inner: Arc<MonitorInner>,
  workers: Mutex<Vec<PeriodicWorker>>,
}

impl fmt::Debug for PerformanceMonitor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.inner.state.read();
    f.debug_struct("PerformanceMonitor")
      .field("series", &state.series.len())
      .field("thresholds", &state.thresholds.len())
      .field("alerts", &state.alerts.len())
      .finish_non_exhaustive()
  }
}

impl PerformanceMonitor {
  pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
    Self::with_parts(
      config,
      Arc::new(SysinfoProbe::new()),
      Arc::new(ReclaimStats::new()),
      Arc::new(TracingAlertSink),
    )
  }

  /// Builds a monitor with an explicit probe, reclaim counter and alert sink.
  ///
  /// When called inside a tokio runtime, that runtime's live task count is
  /// reported as the concurrency level.
  pub fn with_parts(
    config: MonitorConfig,
    probe: Arc<dyn ProcessProbe>,
    reclaim: Arc<ReclaimStats>,
    sink: Arc<dyn AlertSink>,
  ) -> Result<Self, MonitorError> {
    config.validate()?;

    let dispatcher = if config.enable_alerting {
      Some(
        AlertDispatcher::spawn(config.alert_queue_capacity, sink)
          .map_err(|e| MonitorError::Spawn(e.to_string()))?,
      )
    } else {
      None
    };

    let thresholds = config
      .thresholds
      .iter()
      .map(|t| (t.metric_name.clone(), t.clone()))
      .collect();

    let inner = Arc::new(MonitorInner {
      state: RwLock::new(MonitorState {
        thresholds,
        ..MonitorState::default()
      }),
      dispatcher,
      probe,
      reclaim,
      runtime: Handle::try_current().ok(),
      config,
    });

    let sampler_inner = inner.clone();
    let sampler = PeriodicWorker::spawn("monitor-sampler", inner.config.sampling_interval, move || {
      sampler_inner.sample_system();
    })
    .map_err(|e| MonitorError::Spawn(e.to_string()))?;

    let retention_inner = inner.clone();
    let retention = PeriodicWorker::spawn(
      "monitor-retention",
      inner.config.retention_sweep_interval,
      move || {
        retention_inner.prune_expired();
      },
    )
    .map_err(|e| MonitorError::Spawn(e.to_string()))?;

    tracing::debug!(
      target: "ballast::monitor",
      sampling = ?inner.config.sampling_interval,
      retention = ?inner.config.retention_period,
      alerting = inner.config.enable_alerting,
      "performance monitor started"
    );

    Ok(Self {
      inner,
      workers: Mutex::new(vec![sampler, retention]),
    })
  }

  /// Stores a sample and evaluates its threshold.
  ///
  /// Returns the alert the sample raised, if any.
  pub fn record_metric(&self, metric: PerformanceMetric) -> Option<PerformanceAlert> {
    self.inner.record_metric(metric)
  }

  /// The newest `limit` samples of `name`, oldest first; all of them when
  /// `limit` is 0.
  pub fn get_metrics(&self, name: &str, limit: usize) -> Vec<PerformanceMetric> {
    let state = self.inner.state.read();
    state
      .series
      .get(name)
      .map(|series| series.recent(limit))
      .unwrap_or_default()
  }

  /// Names of every series with at least one sample, sorted.
  pub fn metric_names(&self) -> Vec<String> {
    let state = self.inner.state.read();
    let mut names: Vec<String> = state
      .series
      .iter()
      .filter(|(_, series)| !series.is_empty())
      .map(|(name, _)| name.clone())
      .collect();
    names.sort();
    names
  }

  pub fn get_system_metrics(&self) -> SystemMetrics {
    self.inner.system_snapshot()
  }

  /// Takes a system snapshot and records it as four series now.
  pub fn sample_system(&self) -> SystemMetrics {
    self.inner.sample_system()
  }

  pub fn get_alerts(&self, resolved: bool) -> Vec<PerformanceAlert> {
    let state = self.inner.state.read();
    state
      .alerts
      .iter()
      .filter(|alert| alert.resolved == resolved)
      .cloned()
      .collect()
  }

  /// Marks an alert resolved. Resolving twice is not an error.
  pub fn resolve_alert(&self, id: Uuid) -> Result<PerformanceAlert, MonitorError> {
    let mut state = self.inner.state.write();
    let alert = state
      .alerts
      .iter_mut()
      .find(|alert| alert.id == id)
      .ok_or(MonitorError::AlertNotFound(id))?;
    if !alert.resolved {
      alert.resolved = true;
      alert.resolved_at = Some(Utc::now());
      tracing::info!(target: "ballast::monitor", %id, metric = %alert.metric_name, "alert resolved");
    }
    Ok(alert.clone())
  }

  /// Registers or replaces the threshold for `threshold.metric_name`.
  pub fn add_threshold(&self, threshold: PerformanceThreshold) -> Result<(), MonitorError> {
    if let Some(reason) = threshold.invalid_reason() {
      return Err(MonitorError::InvalidThreshold {
        metric: threshold.metric_name,
        reason: reason.to_string(),
      });
    }
    self
      .inner
      .state
      .write()
      .thresholds
      .insert(threshold.metric_name.clone(), threshold);
    Ok(())
  }

  pub fn remove_threshold(&self, metric_name: &str) -> Option<PerformanceThreshold> {
    self.inner.state.write().thresholds.remove(metric_name)
  }

  /// Every registered threshold, sorted by metric name.
  pub fn thresholds(&self) -> Vec<PerformanceThreshold> {
    let state = self.inner.state.read();
    let mut thresholds: Vec<PerformanceThreshold> = state.thresholds.values().cloned().collect();
    thresholds.sort_by(|a, b| a.metric_name.cmp(&b.metric_name));
    thresholds
  }

  /// Runs the retention sweep now. Returns how many samples and alerts went.
  pub fn prune_expired(&self) -> usize {
    self.inner.prune_expired()
  }

  /// Alert notifications dropped because the dispatch queue was full.
  pub fn dropped_alerts(&self) -> u64 {
    self.inner.dispatcher.as_ref().map(|d| d.dropped()).unwrap_or(0)
  }

  /// Alert notifications handed to the sink so far.
  pub fn delivered_alerts(&self) -> u64 {
    self.inner.dispatcher.as_ref().map(|d| d.delivered()).unwrap_or(0)
  }

  pub fn config(&self) -> &MonitorConfig {
    &self.inner.config
  }

  /// Stops the sampler and the retention sweep, then drains the alert queue
  /// and joins the dispatcher. Idempotent.
  pub fn close(&self) -> Result<(), MonitorError> {
    let workers = std::mem::take(&mut *self.workers.lock());
    let mut failures: Vec<String> = workers
      .into_iter()
      .filter_map(|worker| worker.stop().err())
      .map(|panic| panic.to_string())
      .collect();

    if let Some(dispatcher) = &self.inner.dispatcher {
      if let Err(panic) = dispatcher.close() {
        failures.push(panic.to_string());
      }
    }

    tracing::debug!(target: "ballast::monitor", "performance monitor closed");
    if failures.is_empty() {
      Ok(())
    } else {
      Err(MonitorError::Shutdown { failures })
    }
  }
}

impl MonitorInner {
  fn record_metric(&self, metric: PerformanceMetric) -> Option<PerformanceAlert> {
    let cutoff = retention_cutoff(Utc::now(), self.config.retention_period);
    let name = metric.name.clone();
    let value = metric.value;

    let alert = {
      let mut state = self.state.write();
      let series = state.series.entry(name.clone()).or_default();
      series.push(metric, self.config.max_metrics);
      if let Some(cutoff) = cutoff {
        series.prune_before(cutoff);
      }

      if !self.config.enable_alerting {
        return None;
      }
      let threshold = state.thresholds.get(&name)?;
      let (severity, crossed) = threshold.evaluate(value)?;
      let unit = threshold.unit.clone();

      if self.config.dedupe_alerts
        && state
          .alerts
          .iter()
          .any(|a| !a.resolved && a.metric_name == name && a.severity == severity)
      {
        return None;
      }

      let alert = PerformanceAlert::new(&name, severity, crossed, value, &unit);
      state.alerts.push(alert.clone());
      alert
    };

    tracing::debug!(
      target: "ballast::monitor",
      id = %alert.id,
      metric = %alert.metric_name,
      severity = %alert.severity,
      "threshold crossed"
    );
    if let Some(dispatcher) = &self.dispatcher {
      dispatcher.dispatch(alert.clone());
    }
    Some(alert)
  }

  fn system_snapshot(&self) -> SystemMetrics {
    let runtime = self.runtime.clone().or_else(|| Handle::try_current().ok());
    system::snapshot(self.probe.as_ref(), &self.reclaim, runtime.as_ref())
  }

  fn sample_system(&self) -> SystemMetrics {
    let snapshot = self.system_snapshot();
    for metric in system::as_metrics(&snapshot) {
      self.record_metric(metric);
    }
    snapshot
  }

  fn prune_expired(&self) -> usize {
    let Some(cutoff) = retention_cutoff(Utc::now(), self.config.retention_period) else {
      return 0;
    };

    let mut state = self.state.write();
    let mut samples = 0;
    for series in state.series.values_mut() {
      samples += series.prune_before(cutoff);
    }
    state.series.retain(|_, series| !series.is_empty());

    let before = state.alerts.len();
    state.alerts.retain(|alert| {
      !alert.resolved || alert.resolved_at.unwrap_or(alert.timestamp) >= cutoff
    });
    let alerts = before - state.alerts.len();
    drop(state);

    if samples + alerts > 0 {
      tracing::debug!(target: "ballast::monitor", samples, alerts, "retention sweep pruned");
    }
    samples + alerts
  }
}
