#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ballast::monitor::MonitorConfig;
use ballast::pool::{PoolConfig, ResourcePool, ResourceType, ResourceTypeConfig};
use ballast::{AlertSink, FixedProbe, PerformanceAlert, ReclaimStats};
use parking_lot::Mutex;

/// Background intervals long enough that no worker ticks during a test.
pub const QUIET: Duration = Duration::from_secs(3600);

/// An acquire timeout short enough to wait out in a test.
pub const SHORT_WAIT: Duration = Duration::from_millis(50);

/// Collects every alert the monitor dispatches.
#[derive(Debug, Default)]
pub struct RecordingSink {
  alerts: Mutex<Vec<PerformanceAlert>>,
}

impl RecordingSink {
  pub fn alerts(&self) -> Vec<PerformanceAlert> {
    self.alerts.lock().clone()
  }
}

impl AlertSink for RecordingSink {
  fn notify(&self, alert: &PerformanceAlert) {
    self.alerts.lock().push(alert.clone());
  }
}

// Helper for a pool with a single type and no background interference.
pub fn single_type_config(kind: ResourceType, type_config: ResourceTypeConfig) -> PoolConfig {
  PoolConfig {
    cleanup_interval: QUIET,
    ..PoolConfig::empty()
  }
  .with_resource_type(kind, type_config)
}

pub fn build_pool(config: PoolConfig, probe: Arc<FixedProbe>) -> ResourcePool {
  ResourcePool::with_probe(config, probe, Arc::new(ReclaimStats::new())).unwrap()
}

pub fn quiet_monitor_config() -> MonitorConfig {
  MonitorConfig {
    sampling_interval: QUIET,
    retention_sweep_interval: QUIET,
    thresholds: Vec::new(),
    ..MonitorConfig::default()
  }
}

pub fn no_metadata() -> HashMap<String, serde_json::Value> {
  HashMap::new()
}

/// Counts cleanup callback invocations.
#[derive(Debug, Default, Clone)]
pub struct CleanupCounter(Arc<AtomicUsize>);

impl CleanupCounter {
  pub fn count(&self) -> usize {
    self.0.load(Ordering::SeqCst)
  }

  pub fn attach(&self, config: ResourceTypeConfig) -> ResourceTypeConfig {
    let counter = self.0.clone();
    config.cleanup(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok(())
    })
  }
}

/// Polls until the pool reports `expected` queued requests.
pub async fn wait_for_waiters(pool: &ResourcePool, expected: usize) {
  let deadline = Instant::now() + Duration::from_secs(5);
  while pool.metrics().waiting_requests != expected {
    assert!(
      Instant::now() < deadline,
      "timed out waiting for {} queued requests",
      expected
    );
    tokio::time::sleep(Duration::from_millis(2)).await;
  }
}
