use crate::metrics::MetricCounters;
use crate::store::CacheState;
use crate::worker::PeriodicWorker;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// The pieces of the cache the sweeper needs.
pub(crate) struct SweepContext<V> {
  pub(crate) state: Arc<RwLock<CacheState<V>>>,
  pub(crate) metrics: Arc<MetricCounters>,
}

impl<V> Clone for SweepContext<V> {
  fn clone(&self) -> Self {
    Self {
      state: self.state.clone(),
      metrics: self.metrics.clone(),
    }
  }
}

/// Spawns the periodic expiration sweep.
pub(crate) fn spawn<V>(context: SweepContext<V>, interval: Duration) -> io::Result<PeriodicWorker>
where
  V: Send + Sync + 'static,
{
  PeriodicWorker::spawn("cache-sweeper", interval, move || {
    sweep(&context);
  })
}

/// Removes every expired entry, counting one expiration per entry removed.
///
/// Takes the same write lock as foreground operations, so a sweep serializes
/// with concurrent reads and writes.
pub(crate) fn sweep<V>(context: &SweepContext<V>) -> usize {
  let started = Instant::now();
  let removed = context.state.write().remove_expired(started);

  if removed > 0 {
    context.metrics.record_expirations(removed as u64);
    tracing::debug!(
      target: "ballast_cache::sweep",
      removed,
      elapsed = ?started.elapsed(),
      "expired cache entries swept"
    );
  }
  removed
}
