//! Alert notification.
//!
//! New alerts are pushed into a bounded `fibre` channel and drained by one
//! dispatch thread that hands each alert to an [`AlertSink`]. Recording never
//! blocks on notification: when the channel is full the alert is still
//! stored, only its notification is dropped and counted.

use super::types::{AlertSeverity, PerformanceAlert};

use ballast_cache::WorkerPanic;

use core::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_utils::CachePadded;
use fibre::error::TrySendError;
use fibre::mpsc::{self, BoundedSender};
use parking_lot::Mutex;

/// Receives every alert the monitor creates.
///
/// Paging and other external notification hook in here; only the logging
/// sink ships with the crate.
pub trait AlertSink: Send + Sync + fmt::Debug {
  fn notify(&self, alert: &PerformanceAlert);
}

/// Logs alerts at a level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
  fn notify(&self, alert: &PerformanceAlert) {
    match alert.severity {
      AlertSeverity::Critical => tracing::error!(
        target: "ballast::alerts",
        id = %alert.id,
        metric = %alert.metric_name,
        value = alert.value,
        threshold = alert.threshold,
        "{}",
        alert.message
      ),
      AlertSeverity::Warning => tracing::warn!(
        target: "ballast::alerts",
        id = %alert.id,
        metric = %alert.metric_name,
        value = alert.value,
        threshold = alert.threshold,
        "{}",
        alert.message
      ),
      AlertSeverity::Info => tracing::info!(
        target: "ballast::alerts",
        id = %alert.id,
        metric = %alert.metric_name,
        "{}",
        alert.message
      ),
    }
  }
}

/// Owns the alert channel and the thread draining it.
pub(crate) struct AlertDispatcher {
  sender: Mutex<Option<BoundedSender<PerformanceAlert>>>,
  handle: Mutex<Option<JoinHandle<()>>>,
  started_at: Instant,
  dropped: CachePadded<AtomicU64>,
  delivered: Arc<CachePadded<AtomicU64>>,
}

impl fmt::Debug for AlertDispatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AlertDispatcher")
      .field("open", &self.sender.lock().is_some())
      .field("dropped", &self.dropped())
      .field("delivered", &self.delivered())
      .finish()
  }
}

impl AlertDispatcher {
  pub(crate) fn spawn(capacity: usize, sink: Arc<dyn AlertSink>) -> io::Result<Self> {
    let (tx, rx) = mpsc::bounded::<PerformanceAlert>(capacity);
    let delivered = Arc::new(CachePadded::new(AtomicU64::new(0)));
    let delivered_clone = delivered.clone();

    let handle = thread::Builder::new()
      .name("ballast-alert-dispatch".to_string())
      .spawn(move || {
        tracing::debug!(target: "ballast::alerts", "alert dispatcher started");
        // Ends once every sender is gone and the channel is drained.
        while let Ok(alert) = rx.recv() {
          sink.notify(&alert);
          delivered_clone.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(target: "ballast::alerts", "alert dispatcher stopped");
      })?;

    Ok(Self {
      sender: Mutex::new(Some(tx)),
      handle: Mutex::new(Some(handle)),
      started_at: Instant::now(),
      dropped: CachePadded::new(AtomicU64::new(0)),
      delivered,
    })
  }

  /// Queues an alert for notification without blocking.
  pub(crate) fn dispatch(&self, alert: PerformanceAlert) -> bool {
    let sender = self.sender.lock();
    let Some(tx) = sender.as_ref() else {
      return false;
    };
    match tx.try_send(alert) {
      Ok(()) => true,
      Err(TrySendError::Full(alert)) => {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
          target: "ballast::alerts",
          id = %alert.id,
          metric = %alert.metric_name,
          "alert queue full; notification dropped"
        );
        false
      }
      Err(_) => false,
    }
  }

  pub(crate) fn dropped(&self) -> u64 {
    self.dropped.load(Ordering::Relaxed)
  }

  pub(crate) fn delivered(&self) -> u64 {
    self.delivered.load(Ordering::Relaxed)
  }

  /// Closes the channel and waits for queued alerts to be delivered.
  pub(crate) fn close(&self) -> Result<(), WorkerPanic> {
    drop(self.sender.lock().take());
    match self.handle.lock().take() {
      Some(handle) => handle.join().map_err(|_| WorkerPanic {
        name: "alert-dispatch",
        ran_for: self.started_at.elapsed(),
      }),
      None => Ok(()),
    }
  }
}

impl Drop for AlertDispatcher {
  fn drop(&mut self) {
    if let Err(panic) = self.close() {
      tracing::error!(target: "ballast::alerts", worker = panic.name, "alert dispatcher panicked");
    }
  }
}
