use super::types::{PerformanceMetric, SystemMetrics};
use crate::probe::ProcessProbe;
use crate::reclaim::ReclaimStats;

use chrono::Utc;
use tokio::runtime::Handle;

pub const CPU_PERCENT: &str = "system.cpu_percent";
pub const MEMORY_BYTES: &str = "system.memory_bytes";
pub const CONCURRENCY: &str = "system.concurrency";
pub const HEAP_BYTES: &str = "system.heap_bytes";

/// Reads the process, the runtime and the reclaim counter.
pub(crate) fn snapshot(
  probe: &dyn ProcessProbe,
  reclaim: &ReclaimStats,
  runtime: Option<&Handle>,
) -> SystemMetrics {
  let sample = probe.sample();
  let concurrency = runtime
    .map(|handle| handle.metrics().num_alive_tasks())
    .unwrap_or(0);

  SystemMetrics {
    timestamp: Utc::now(),
    cpu_percent: f64::from(sample.cpu_percent),
    memory_bytes: sample.resident_bytes,
    concurrency,
    heap_bytes: sample.virtual_bytes,
    reclaim_count: reclaim.runs(),
    last_reclaim: reclaim.last_run(),
  }
}

/// The four series the self-sampler records for one snapshot.
pub(crate) fn as_metrics(snapshot: &SystemMetrics) -> [PerformanceMetric; 4] {
  [
    PerformanceMetric::new(CPU_PERCENT, snapshot.cpu_percent, "percent").at(snapshot.timestamp),
    PerformanceMetric::new(MEMORY_BYTES, snapshot.memory_bytes as f64, "bytes").at(snapshot.timestamp),
    PerformanceMetric::new(CONCURRENCY, snapshot.concurrency as f64, "tasks").at(snapshot.timestamp),
    PerformanceMetric::new(HEAP_BYTES, snapshot.heap_bytes as f64, "bytes").at(snapshot.timestamp),
  ]
}
