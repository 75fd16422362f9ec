use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

/// Counts memory-pressure reclaims.
///
/// The pool's memory watchdog records here whenever it frees idle resources
/// because the process is over its ceiling; the monitor reports the count and
/// the time of the last run alongside its other system figures.
#[derive(Debug, Default)]
pub struct ReclaimStats {
  runs: CachePadded<AtomicU64>,
  resources_freed: CachePadded<AtomicU64>,
  last_run: Mutex<Option<DateTime<Utc>>>,
}

impl ReclaimStats {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&self, freed: usize) {
    self.runs.fetch_add(1, Ordering::Relaxed);
    self.resources_freed.fetch_add(freed as u64, Ordering::Relaxed);
    *self.last_run.lock() = Some(Utc::now());
  }

  pub fn runs(&self) -> u64 {
    self.runs.load(Ordering::Relaxed)
  }

  pub fn resources_freed(&self) -> u64 {
    self.resources_freed.load(Ordering::Relaxed)
  }

  pub fn last_run(&self) -> Option<DateTime<Utc>> {
    *self.last_run.lock()
  }
}
