use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use serde::Serialize;

/// Lock-free hit/miss and churn counters.
///
/// All fields are atomic so they can be bumped from inside or outside the
/// cache lock and read at any time without blocking other operations.
#[derive(Debug)]
pub struct MetricCounters {
  // --- Hit/Miss Ratios ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Throughput ---
  pub(crate) sets: CachePadded<AtomicU64>,
  pub(crate) deletes: CachePadded<AtomicU64>,

  // --- Removal Stats ---
  pub(crate) evictions: CachePadded<AtomicU64>,
  pub(crate) expirations: CachePadded<AtomicU64>,

  enabled: bool,
  created_at: Instant,
}

// Manual implementation of Default to handle the non-default `Instant`.
impl Default for MetricCounters {
  fn default() -> Self {
    Self::new(true)
  }
}

impl MetricCounters {
  /// Creates a counter set. When `enabled` is false every `record_*` call is a no-op.
  pub fn new(enabled: bool) -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      sets: CachePadded::new(AtomicU64::new(0)),
      deletes: CachePadded::new(AtomicU64::new(0)),
      evictions: CachePadded::new(AtomicU64::new(0)),
      expirations: CachePadded::new(AtomicU64::new(0)),
      enabled,
      created_at: Instant::now(),
    }
  }

  #[inline]
  fn bump(&self, counter: &AtomicU64, by: u64) {
    if self.enabled && by > 0 {
      counter.fetch_add(by, Ordering::Relaxed);
    }
  }

  #[inline]
  pub fn record_hit(&self) {
    self.bump(&self.hits, 1);
  }

  #[inline]
  pub fn record_miss(&self) {
    self.bump(&self.misses, 1);
  }

  #[inline]
  pub fn record_set(&self) {
    self.bump(&self.sets, 1);
  }

  #[inline]
  pub fn record_delete(&self) {
    self.bump(&self.deletes, 1);
  }

  #[inline]
  pub fn record_evictions(&self, count: u64) {
    self.bump(&self.evictions, count);
  }

  #[inline]
  pub fn record_expirations(&self, count: u64) {
    self.bump(&self.expirations, count);
  }

  /// Zeroes every counter. Uptime is not reset.
  pub fn reset(&self) {
    for counter in [
      &self.hits,
      &self.misses,
      &self.sets,
      &self.deletes,
      &self.evictions,
      &self.expirations,
    ] {
      counter.store(0, Ordering::Relaxed);
    }
  }

  /// hits / (hits + misses), or 0 when there has been no traffic.
  pub fn hit_rate(&self) -> f64 {
    ratio(
      self.hits.load(Ordering::Relaxed),
      self.misses.load(Ordering::Relaxed),
    )
  }

  /// Creates a point-in-time snapshot. Entry count and total size are owned by
  /// the cache state, so the caller supplies them.
  pub(crate) fn snapshot(&self, entry_count: usize, total_size: u64) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);

    MetricsSnapshot {
      hits,
      misses,
      hit_rate: ratio(hits, misses),
      sets: self.sets.load(Ordering::Relaxed),
      deletes: self.deletes.load(Ordering::Relaxed),
      evictions: self.evictions.load(Ordering::Relaxed),
      expirations: self.expirations.load(Ordering::Relaxed),
      entry_count,
      total_size,
      uptime: self.created_at.elapsed(),
    }
  }
}

#[inline]
fn ratio(hits: u64, misses: u64) -> f64 {
  let total_lookups = hits + misses;
  if total_lookups == 0 {
    0.0
  } else {
    hits as f64 / total_lookups as f64
  }
}

/// A point-in-time, public-facing snapshot of the cache's metrics.
#[derive(Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
  /// The number of successful lookups.
  pub hits: u64,
  /// The number of failed lookups, expired entries included.
  pub misses: u64,
  /// hits / (hits + misses); 0 when there has been no traffic.
  pub hit_rate: f64,
  /// The number of successful `set` calls.
  pub sets: u64,
  /// The number of explicit deletes that removed an entry.
  pub deletes: u64,
  /// Entries removed to make room for new ones.
  pub evictions: u64,
  /// Entries removed because their TTL elapsed, on read or by the sweeper.
  pub expirations: u64,
  /// Live entries at snapshot time.
  pub entry_count: usize,
  /// Sum of the serialized sizes of live entries, in bytes.
  pub total_size: u64,
  /// Time since the cache was built.
  pub uptime: Duration,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_rate", &format!("{:.2}%", self.hit_rate * 100.0))
      .field("sets", &self.sets)
      .field("deletes", &self.deletes)
      .field("evictions", &self.evictions)
      .field("expirations", &self.expirations)
      .field("entry_count", &self.entry_count)
      .field("total_size", &self.total_size)
      .field("uptime", &self.uptime)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hit_rate_is_zero_without_traffic() {
    let counters = MetricCounters::new(true);
    assert_eq!(counters.hit_rate(), 0.0);
    assert_eq!(counters.snapshot(0, 0).hit_rate, 0.0);
  }

  #[test]
  fn hit_rate_tracks_hits_and_misses() {
    let counters = MetricCounters::new(true);
    counters.record_hit();
    counters.record_hit();
    counters.record_hit();
    counters.record_miss();
    assert!((counters.hit_rate() - 0.75).abs() < f64::EPSILON);
  }

  #[test]
  fn disabled_counters_stay_at_zero() {
    let counters = MetricCounters::new(false);
    counters.record_hit();
    counters.record_set();
    counters.record_evictions(3);
    let snap = counters.snapshot(2, 10);
    assert_eq!(snap.hits, 0);
    assert_eq!(snap.sets, 0);
    assert_eq!(snap.evictions, 0);
    assert_eq!(snap.entry_count, 2);
  }

  #[test]
  fn reset_clears_counts() {
    let counters = MetricCounters::new(true);
    counters.record_miss();
    counters.record_expirations(2);
    counters.reset();
    let snap = counters.snapshot(0, 0);
    assert_eq!(snap.misses, 0);
    assert_eq!(snap.expirations, 0);
  }
}
