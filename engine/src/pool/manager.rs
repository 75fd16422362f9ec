use super::config::ResourceTypeConfig;
use super::error::PoolError;
use super::metrics::TypeStats;
use super::resource::{Resource, ResourceType};

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use tokio::sync::oneshot;

/// What a waiting caller eventually receives.
pub(crate) type Grant = Result<Resource, PoolError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RequestPriority {
  #[default]
  Normal,
}

/// A caller parked in a type's wait queue.
#[derive(Debug)]
pub(crate) struct ResourceRequest {
  pub(crate) id: u64,
  pub(crate) priority: RequestPriority,
  pub(crate) metadata: HashMap<String, serde_json::Value>,
  pub(crate) enqueued_at: Instant,
  pub(crate) reply: oneshot::Sender<Grant>,
}

/// Bookkeeping for one resource type.
///
/// `current_size` counts every live resource of the type: idle, checked out,
/// or reserved while its factory runs. The idle list, the size and the wait
/// queue only change together under the pool's write lock.
#[derive(Debug)]
pub(crate) struct ResourceManager {
  pub(crate) kind: ResourceType,
  pub(crate) config: ResourceTypeConfig,
  pub(crate) current_size: usize,
  idle: VecDeque<Resource>,
  waiters: VecDeque<ResourceRequest>,
}

impl ResourceManager {
  pub(crate) fn new(kind: ResourceType, config: ResourceTypeConfig) -> Self {
    Self {
      kind,
      config,
      current_size: 0,
      idle: VecDeque::new(),
      waiters: VecDeque::new(),
    }
  }

  pub(crate) fn has_room(&self) -> bool {
    self.current_size < self.config.max_size
  }

  pub(crate) fn idle_len(&self) -> usize {
    self.idle.len()
  }

  pub(crate) fn waiting_len(&self) -> usize {
    self.waiters.len()
  }

  /// Takes the most recently parked idle resource.
  pub(crate) fn take_idle(&mut self) -> Option<Resource> {
    self.idle.pop_back()
  }

  pub(crate) fn park(&mut self, mut resource: Resource, now: Instant) {
    resource.active = false;
    resource.last_used = now;
    self.idle.push_back(resource);
  }

  /// Drops requests whose callers have gone away, then reports whether
  /// anyone is still waiting.
  pub(crate) fn has_live_waiters(&mut self) -> bool {
    self.waiters.retain(|request| !request.reply.is_closed());
    !self.waiters.is_empty()
  }

  pub(crate) fn enqueue(&mut self, request: ResourceRequest) {
    self.waiters.push_back(request);
  }

  /// Removes a request by id, leaving the rest of the queue in order.
  pub(crate) fn withdraw(&mut self, id: u64) -> bool {
    match self.waiters.iter().position(|request| request.id == id) {
      Some(index) => {
        self.waiters.remove(index);
        true
      }
      None => false,
    }
  }

  pub(crate) fn next_waiter(&mut self) -> Option<ResourceRequest> {
    while let Some(request) = self.waiters.pop_front() {
      if !request.reply.is_closed() {
        return Some(request);
      }
    }
    None
  }

  /// Gives `resource` to the oldest live waiter. Hands the resource back if
  /// nobody is waiting.
  pub(crate) fn grant_to_waiter(&mut self, mut resource: Resource) -> Result<u64, Resource> {
    while let Some(request) = self.next_waiter() {
      let waited = request.enqueued_at.elapsed();
      resource.check_out(request.metadata);
      match request.reply.send(Ok(resource)) {
        Ok(()) => {
          tracing::trace!(
            target: "ballast::pool",
            kind = %self.kind,
            request = request.id,
            priority = ?request.priority,
            ?waited,
            "waiter granted a released resource"
          );
          return Ok(request.id);
        }
        Err(Ok(returned)) => resource = returned,
        Err(Err(_)) => unreachable!("grant_to_waiter only sends resources"),
      }
    }
    Err(resource)
  }

  /// Removes idle resources unused for at least the idle timeout.
  pub(crate) fn take_expired_idle(&mut self, now: Instant) -> Vec<Resource> {
    let idle_timeout = self.config.idle_timeout;
    let (expired, kept): (Vec<_>, Vec<_>) = self
      .idle
      .drain(..)
      .partition(|resource| now.saturating_duration_since(resource.last_used) >= idle_timeout);
    self.idle = kept.into();
    self.current_size -= expired.len();
    expired
  }

  /// Removes every idle resource.
  pub(crate) fn drain_idle(&mut self) -> Vec<Resource> {
    let drained: Vec<Resource> = self.idle.drain(..).collect();
    self.current_size -= drained.len();
    drained
  }

  pub(crate) fn drain_waiters(&mut self) -> Vec<ResourceRequest> {
    self.waiters.drain(..).collect()
  }

  pub(crate) fn stats(&self) -> TypeStats {
    TypeStats {
      kind: self.kind,
      max_size: self.config.max_size,
      current_size: self.current_size,
      active: self.current_size.saturating_sub(self.idle.len()),
      idle: self.idle.len(),
      waiting: self.waiters.len(),
    }
  }
}
