//! Periodic background workers with cooperative shutdown.
//!
//! Every background task in ballast (the cache sweeper, the pool reaper and
//! memory watchdog, the monitor's sampler and retention sweep) runs on one of
//! these. A worker owns a named OS thread that calls its tick closure once per
//! interval until the shared stop signal is raised. Stopping wakes the thread
//! immediately rather than waiting out the current interval, then joins it.

use crate::error::WorkerPanic;

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A stop flag that sleeping workers can wait on.
#[derive(Debug, Default)]
pub struct StopSignal {
  stopped: Mutex<bool>,
  condvar: Condvar,
}

impl StopSignal {
  pub fn new() -> Self {
    Self::default()
  }

  /// Raises the signal and wakes every waiter.
  pub fn stop(&self) {
    let mut stopped = self.stopped.lock();
    *stopped = true;
    self.condvar.notify_all();
  }

  pub fn is_stopped(&self) -> bool {
    *self.stopped.lock()
  }

  /// Sleeps for up to `timeout`. Returns `true` if the signal was raised.
  pub fn wait_timeout(&self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut stopped = self.stopped.lock();
    while !*stopped {
      if self.condvar.wait_until(&mut stopped, deadline).timed_out() {
        break;
      }
    }
    *stopped
  }
}

/// A named background thread running a closure on a fixed interval.
#[derive(Debug)]
pub struct PeriodicWorker {
  name: &'static str,
  started_at: Instant,
  handle: Option<JoinHandle<()>>,
  stop: Arc<StopSignal>,
}

impl PeriodicWorker {
  /// Spawns a worker that calls `tick` every `interval` until stopped.
  ///
  /// The first tick happens one full interval after spawning.
  pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> io::Result<Self>
  where
    F: FnMut() + Send + 'static,
  {
    let stop = Arc::new(StopSignal::new());
    let stop_clone = stop.clone();

    let handle = thread::Builder::new()
      .name(format!("ballast-{}", name))
      .spawn(move || {
        tracing::debug!(worker = name, ?interval, "worker started");
        while !stop_clone.wait_timeout(interval) {
          tick();
        }
        tracing::debug!(worker = name, "worker stopped");
      })?;

    Ok(Self {
      name,
      started_at: Instant::now(),
      handle: Some(handle),
      stop,
    })
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Raises the stop signal and blocks until the thread has exited.
  pub fn stop(mut self) -> Result<(), WorkerPanic> {
    self.shutdown()
  }

  fn shutdown(&mut self) -> Result<(), WorkerPanic> {
    self.stop.stop();
    match self.handle.take() {
      Some(handle) => handle.join().map_err(|_| WorkerPanic {
        name: self.name,
        ran_for: self.started_at.elapsed(),
      }),
      None => Ok(()),
    }
  }
}

impl Drop for PeriodicWorker {
  fn drop(&mut self) {
    if let Err(panic) = self.shutdown() {
      tracing::error!(worker = panic.name, "worker panicked before shutdown");
    }
  }
}
