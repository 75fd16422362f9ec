use super::resource::ResourceType;

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;
use serde::Serialize;

/// Lock-free lifetime counters for the pool.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
  pub(crate) created: CachePadded<AtomicU64>,
  pub(crate) reused: CachePadded<AtomicU64>,
  pub(crate) destroyed: CachePadded<AtomicU64>,
  pub(crate) timeouts: CachePadded<AtomicU64>,
  pub(crate) cancellations: CachePadded<AtomicU64>,
}

impl PoolCounters {
  pub(crate) fn bump(counter: &AtomicU64, by: u64) {
    if by > 0 {
      counter.fetch_add(by, Ordering::Relaxed);
    }
  }

  fn load(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
  }
}

/// A point-in-time view of the pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolMetrics {
  pub total_resources: usize,
  pub active_resources: usize,
  pub idle_resources: usize,
  pub waiting_requests: usize,
  /// Resident memory of the process when the snapshot was taken.
  pub memory_bytes: u64,
  pub max_memory_bytes: u64,
  /// `active / total`, or 0 when the pool holds nothing.
  pub utilization: f64,
  pub created: u64,
  pub reused: u64,
  pub destroyed: u64,
  pub timeouts: u64,
  pub cancellations: u64,
  pub reclaims: u64,
}

impl PoolMetrics {
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn new(
    counters: &PoolCounters,
    total_resources: usize,
    idle_resources: usize,
    waiting_requests: usize,
    memory_bytes: u64,
    max_memory_bytes: u64,
    reclaims: u64,
  ) -> Self {
    let active_resources = total_resources.saturating_sub(idle_resources);
    let utilization = if total_resources == 0 {
      0.0
    } else {
      active_resources as f64 / total_resources as f64
    };
    Self {
      total_resources,
      active_resources,
      idle_resources,
      waiting_requests,
      memory_bytes,
      max_memory_bytes,
      utilization,
      created: PoolCounters::load(&counters.created),
      reused: PoolCounters::load(&counters.reused),
      destroyed: PoolCounters::load(&counters.destroyed),
      timeouts: PoolCounters::load(&counters.timeouts),
      cancellations: PoolCounters::load(&counters.cancellations),
      reclaims,
    }
  }
}

/// Per-type occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeStats {
  pub kind: ResourceType,
  pub max_size: usize,
  pub current_size: usize,
  pub active: usize,
  pub idle: usize,
  pub waiting: usize,
}
