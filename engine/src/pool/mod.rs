//! A typed pool of expensive-to-create resources.
//!
//! Admission runs in three steps: reuse an idle resource of the requested
//! type, create a new one if the type's cap, the global cap and the memory
//! ceiling all allow it, or park the caller in that type's FIFO wait queue.
//! Parked callers are woken by `release`, by capacity freed elsewhere, or give
//! up on their own timeout or cancellation token.

mod config;
mod error;
mod manager;
mod metrics;
mod resource;

pub use config::{
  PoolConfig, ResourceTypeConfig, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_CLEANUP_INTERVAL,
  DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_MEMORY_MB, DEFAULT_MAX_TOTAL_RESOURCES, DEFAULT_TYPE_MAX_SIZE,
};
pub use error::PoolError;
pub use metrics::{PoolMetrics, TypeStats};
pub use resource::{Resource, ResourceCleanup, ResourceFactory, ResourceHandle, ResourceType};

use manager::{Grant, RequestPriority, ResourceManager, ResourceRequest};
use metrics::PoolCounters;

use crate::probe::{ProcessProbe, SysinfoProbe};
use crate::reclaim::ReclaimStats;

use ballast_cache::PeriodicWorker;

use core::fmt;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// The outcome of a non-blocking admission attempt.
enum Admission {
  Ready(Resource),
  Create(Reservation),
  Queued {
    id: u64,
    rx: oneshot::Receiver<Grant>,
    timeout: Duration,
  },
}

/// A slot counted against a type's capacity while its factory runs.
struct Reservation {
  kind: ResourceType,
  metadata: HashMap<String, serde_json::Value>,
  factory: Option<ResourceFactory>,
  cleanup: Option<ResourceCleanup>,
}

struct PoolState {
  managers: BTreeMap<ResourceType, ResourceManager>,
  closed: bool,
}

impl PoolState {
  fn total(&self) -> usize {
    self.managers.values().map(|m| m.current_size).sum()
  }
}

struct PoolInner {
  config: PoolConfig,
  state: RwLock<PoolState>,
  counters: PoolCounters,
  probe: Arc<dyn ProcessProbe>,
  reclaim: Arc<ReclaimStats>,
  next_id: AtomicU64,
}

/// A bounded, typed resource pool. See the module docs for admission rules.
pub struct ResourcePool {
  inner: Arc<PoolInner>,
  workers: Mutex<Vec<PeriodicWorker>>,
}

impl fmt::Debug for ResourcePool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.inner.state.read();
    f.debug_struct("ResourcePool")
      .field("types", &state.managers.keys().collect::<Vec<_>>())
      .field("total", &state.total())
      .field("closed", &state.closed)
      .finish_non_exhaustive()
  }
}

impl ResourcePool {
  /// Builds a pool that reads process memory through `sysinfo`.
  pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
    Self::with_probe(config, Arc::new(SysinfoProbe::new()), Arc::new(ReclaimStats::new()))
  }

  /// Builds a pool with an explicit memory probe and reclaim counter, and
  /// starts the idle reaper and the memory watchdog.
  pub fn with_probe(
    config: PoolConfig,
    probe: Arc<dyn ProcessProbe>,
    reclaim: Arc<ReclaimStats>,
  ) -> Result<Self, PoolError> {
    config.validate()?;

    let managers = config
      .resource_types
      .iter()
      .map(|(kind, type_config)| (*kind, ResourceManager::new(*kind, type_config.clone())))
      .collect();
    let interval = config.cleanup_interval;

    let inner = Arc::new(PoolInner {
      config,
      state: RwLock::new(PoolState {
        managers,
        closed: false,
      }),
      counters: PoolCounters::default(),
      probe,
      reclaim,
      next_id: AtomicU64::new(1),
    });

    let reaper_inner = inner.clone();
    let reaper = PeriodicWorker::spawn("pool-reaper", interval, move || {
      reaper_inner.reap_idle();
    })
    .map_err(|e| PoolError::Spawn(e.to_string()))?;

    let watchdog_inner = inner.clone();
    let watchdog = PeriodicWorker::spawn("pool-memory", interval, move || {
      watchdog_inner.check_memory();
    })
    .map_err(|e| PoolError::Spawn(e.to_string()))?;

    tracing::debug!(
      target: "ballast::pool",
      max_total = inner.config.max_total_resources,
      max_memory_mb = inner.config.max_memory_mb,
      "resource pool started"
    );

    Ok(Self {
      inner,
      workers: Mutex::new(vec![reaper, watchdog]),
    })
  }

  /// Acquires a resource of `kind`, waiting in line if the pool is saturated.
  ///
  /// Waits at most the type's acquire timeout. Cancelling `cancel` abandons
  /// the wait; the caller's place in the queue is given up without disturbing
  /// the others.
  pub async fn acquire(
    &self,
    cancel: &CancellationToken,
    kind: ResourceType,
    metadata: HashMap<String, serde_json::Value>,
  ) -> Result<Resource, PoolError> {
    if cancel.is_cancelled() {
      PoolCounters::bump(&self.inner.counters.cancellations, 1);
      return Err(PoolError::Cancelled(kind));
    }

    let (id, mut rx, timeout) = match self.inner.admit(kind, metadata)? {
      Admission::Ready(resource) => return Ok(resource),
      Admission::Create(reservation) => {
        let created = self.inner.create(reservation);
        if created.is_err() {
          // The slot went back; someone may have queued behind it.
          self.inner.serve_waiters();
        }
        return created;
      }
      Admission::Queued { id, rx, timeout } => (id, rx, timeout),
    };

    let failure = tokio::select! {
      biased;
      grant = &mut rx => {
        return match grant {
          Ok(grant) => grant,
          Err(_) => Err(PoolError::Closed),
        };
      }
      _ = cancel.cancelled() => {
        PoolCounters::bump(&self.inner.counters.cancellations, 1);
        PoolError::Cancelled(kind)
      }
      _ = tokio::time::sleep(timeout) => {
        PoolCounters::bump(&self.inner.counters.timeouts, 1);
        PoolError::Exhausted { kind, waited: timeout }
      }
    };

    self.inner.abandon(kind, id, rx);
    tracing::debug!(target: "ballast::pool", %kind, request = id, error = %failure, "acquire gave up");
    Err(failure)
  }

  /// Returns a resource to the pool.
  ///
  /// A resource checked out for less than its idle timeout goes to the oldest
  /// waiter of its type, or back to the idle list. Anything older is cleaned
  /// up and its capacity offered to whoever is waiting.
  pub fn release(&self, resource: Resource) -> Result<(), PoolError> {
    self.inner.release(resource)
  }

  pub fn metrics(&self) -> PoolMetrics {
    let (total, idle, waiting) = {
      let state = self.inner.state.read();
      let idle = state.managers.values().map(|m| m.idle_len()).sum();
      let waiting = state.managers.values().map(|m| m.waiting_len()).sum();
      (state.total(), idle, waiting)
    };
    PoolMetrics::new(
      &self.inner.counters,
      total,
      idle,
      waiting,
      self.inner.probe.resident_bytes(),
      self.inner.config.max_memory_bytes(),
      self.inner.reclaim.runs(),
    )
  }

  /// Occupancy of every configured type.
  pub fn type_stats(&self) -> Vec<TypeStats> {
    let state = self.inner.state.read();
    state.managers.values().map(|m| m.stats()).collect()
  }

  pub fn config(&self) -> &PoolConfig {
    &self.inner.config
  }

  pub fn reclaim_stats(&self) -> &Arc<ReclaimStats> {
    &self.inner.reclaim
  }

  /// Runs the idle reaper now. Returns how many resources it destroyed.
  pub fn reap_idle(&self) -> usize {
    self.inner.reap_idle()
  }

  /// Runs the memory check now. Returns how many idle resources it freed.
  pub fn check_memory(&self) -> usize {
    self.inner.check_memory()
  }

  pub fn is_closed(&self) -> bool {
    self.inner.state.read().closed
  }

  /// Stops the background workers, fails every waiter with `Closed` and
  /// cleans up every idle resource. Resources still checked out are cleaned
  /// up when they are released. Idempotent.
  pub fn close(&self) -> Result<(), PoolError> {
    let workers = std::mem::take(&mut *self.workers.lock());
    let mut failures = Vec::new();
    for worker in workers {
      if let Err(panic) = worker.stop() {
        failures.push(panic.to_string());
      }
    }

    let (idle, waiters) = {
      let mut state = self.inner.state.write();
      state.closed = true;
      let mut idle = Vec::new();
      let mut waiters = Vec::new();
      for manager in state.managers.values_mut() {
        idle.extend(manager.drain_idle());
        waiters.extend(manager.drain_waiters());
      }
      (idle, waiters)
    };

    for request in waiters {
      let _ = request.reply.send(Err(PoolError::Closed));
    }
    let destroyed = idle.len();
    for resource in idle {
      if let Err(e) = self.inner.destroy(&resource) {
        failures.push(format!("{}: {}", resource.id, e));
      }
    }

    tracing::debug!(target: "ballast::pool", destroyed, "resource pool closed");
    if failures.is_empty() {
      Ok(())
    } else {
      Err(PoolError::Cleanup { failures })
    }
  }
}

impl PoolInner {
  fn next_id(&self) -> u64 {
    self.next_id.fetch_add(1, Ordering::Relaxed)
  }

  fn memory_allows_creation(&self) -> bool {
    self.probe.resident_bytes() < self.config.max_memory_bytes()
  }

  /// Decides, under the write lock, how an acquire proceeds.
  fn admit(
    &self,
    kind: ResourceType,
    metadata: HashMap<String, serde_json::Value>,
  ) -> Result<Admission, PoolError> {
    let mut state = self.state.write();
    if state.closed {
      return Err(PoolError::Closed);
    }
    let total = state.total();
    let manager = state
      .managers
      .get_mut(&kind)
      .ok_or(PoolError::TypeNotConfigured(kind))?;

    // Callers already in line keep their place.
    if !manager.has_live_waiters() {
      if let Some(mut resource) = manager.take_idle() {
        resource.check_out(metadata);
        PoolCounters::bump(&self.counters.reused, 1);
        return Ok(Admission::Ready(resource));
      }

      if manager.has_room()
        && total < self.config.max_total_resources
        && self.memory_allows_creation()
      {
        manager.current_size += 1;
        return Ok(Admission::Create(Reservation {
          kind,
          metadata,
          factory: manager.config.factory.clone(),
          cleanup: manager.config.cleanup.clone(),
        }));
      }
    }

    let id = self.next_id();
    let (reply, rx) = oneshot::channel();
    let timeout = self.config.acquire_timeout_for(kind);
    manager.enqueue(ResourceRequest {
      id,
      priority: RequestPriority::Normal,
      metadata,
      enqueued_at: Instant::now(),
      reply,
    });
    tracing::debug!(
      target: "ballast::pool",
      %kind,
      request = id,
      waiting = manager.waiting_len(),
      "pool saturated; request queued"
    );

    Ok(Admission::Queued { id, rx, timeout })
  }

  /// Runs the factory for a reserved slot. The slot is given back on failure.
  fn create(&self, reservation: Reservation) -> Result<Resource, PoolError> {
    let Reservation {
      kind,
      metadata,
      factory,
      cleanup,
    } = reservation;

    let handle = match factory {
      Some(factory) => match factory(kind) {
        Ok(handle) => Some(handle),
        Err(source) => {
          if let Some(manager) = self.state.write().managers.get_mut(&kind) {
            manager.current_size -= 1;
          }
          tracing::warn!(target: "ballast::pool", %kind, error = %source, "resource factory failed");
          return Err(PoolError::Creation { kind, source });
        }
      },
      None => None,
    };

    let mut resource = Resource::new(format!("{}-{}", kind, self.next_id()), kind, handle, cleanup);
    resource.check_out(metadata);
    PoolCounters::bump(&self.counters.created, 1);
    tracing::debug!(target: "ballast::pool", id = %resource.id, "resource created");
    Ok(resource)
  }

  /// Cleans up after an acquire that stopped waiting. If the request already
  /// left the queue a grant may be in flight; it goes straight back to the pool.
  fn abandon(&self, kind: ResourceType, id: u64, mut rx: oneshot::Receiver<Grant>) {
    let withdrawn = {
      let mut state = self.state.write();
      state
        .managers
        .get_mut(&kind)
        .map(|manager| manager.withdraw(id))
        .unwrap_or(false)
    };
    if withdrawn {
      return;
    }

    rx.close();
    if let Ok(Ok(resource)) = rx.try_recv() {
      tracing::debug!(target: "ballast::pool", id = %resource.id, "returning a grant that lost the race");
      if let Err(e) = self.release(resource) {
        tracing::warn!(target: "ballast::pool", error = %e, "failed to return a raced grant");
      }
    }
  }

  fn release(&self, mut resource: Resource) -> Result<(), PoolError> {
    let now = Instant::now();
    let mut state = self.state.write();
    let closed = state.closed;
    let manager = state
      .managers
      .get_mut(&resource.kind)
      .ok_or(PoolError::TypeNotConfigured(resource.kind))?;

    let fresh = now.saturating_duration_since(resource.last_used) < manager.config.idle_timeout;
    if fresh && !closed {
      match manager.grant_to_waiter(resource) {
        Ok(_) => PoolCounters::bump(&self.counters.reused, 1),
        Err(returned) => manager.park(returned, now),
      }
      return Ok(());
    }

    manager.current_size -= 1;
    resource.active = false;
    drop(state);

    let result = self.destroy(&resource);
    self.serve_waiters();
    result.map_err(|source| PoolError::Cleanup {
      failures: vec![format!("{}: {}", resource.id, source)],
    })
  }

  /// Runs a resource's cleanup callback. Never called under the lock.
  fn destroy(&self, resource: &Resource) -> Result<(), crate::error::BoxError> {
    PoolCounters::bump(&self.counters.destroyed, 1);
    let result = resource.run_cleanup();
    match &result {
      Ok(()) => tracing::debug!(target: "ballast::pool", id = %resource.id, "resource destroyed"),
      Err(e) => tracing::warn!(
        target: "ballast::pool",
        id = %resource.id,
        error = %e,
        "resource cleanup failed"
      ),
    }
    result
  }

  /// Offers free capacity to waiting callers, creating resources for them.
  fn serve_waiters(&self) {
    loop {
      let (request, reservation) = {
        let mut state = self.state.write();
        if state.closed || state.total() >= self.config.max_total_resources {
          return;
        }
        let mut candidate = None;
        for manager in state.managers.values_mut() {
          if manager.has_room() && manager.has_live_waiters() {
            candidate = Some(manager);
            break;
          }
        }
        let Some(manager) = candidate else {
          return;
        };
        if !self.memory_allows_creation() {
          return;
        }
        let Some(mut request) = manager.next_waiter() else {
          return;
        };
        manager.current_size += 1;
        let reservation = Reservation {
          kind: manager.kind,
          metadata: std::mem::take(&mut request.metadata),
          factory: manager.config.factory.clone(),
          cleanup: manager.config.cleanup.clone(),
        };
        (request, reservation)
      };

      match self.create(reservation) {
        Ok(resource) => {
          if let Err(Ok(resource)) = request.reply.send(Ok(resource)) {
            // The caller left while the factory ran.
            if let Err(e) = self.release(resource) {
              tracing::warn!(target: "ballast::pool", error = %e, "failed to park an unclaimed resource");
            }
          }
        }
        Err(e) => {
          let _ = request.reply.send(Err(e));
        }
      }
    }
  }

  fn reap_idle(&self) -> usize {
    let now = Instant::now();
    let expired: Vec<Resource> = {
      let mut state = self.state.write();
      state
        .managers
        .values_mut()
        .flat_map(|manager| manager.take_expired_idle(now))
        .collect()
    };

    let reaped = expired.len();
    for resource in &expired {
      let _ = self.destroy(resource);
    }
    if reaped > 0 {
      tracing::debug!(target: "ballast::pool", reaped, "idle resources reaped");
    }
    self.serve_waiters();
    reaped
  }

  /// Frees every idle resource when the process is over its memory ceiling.
  fn check_memory(&self) -> usize {
    let used = self.probe.resident_bytes();
    let ceiling = self.config.max_memory_bytes();
    if used <= ceiling {
      return 0;
    }

    let idle: Vec<Resource> = {
      let mut state = self.state.write();
      state
        .managers
        .values_mut()
        .flat_map(|manager| manager.drain_idle())
        .collect()
    };
    for resource in &idle {
      let _ = self.destroy(resource);
    }
    self.reclaim.record(idle.len());
    tracing::warn!(
      target: "ballast::pool",
      used,
      ceiling,
      freed = idle.len(),
      "memory above ceiling; idle resources reclaimed"
    );
    idle.len()
  }
}
