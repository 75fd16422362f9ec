use crate::builder::{CacheBuilder, CacheConfig};
use crate::entry::{CacheEntry, CacheEntryInfo, SetOptions};
use crate::error::{BuildError, CacheError, Result};
use crate::metrics::{MetricCounters, MetricsSnapshot};
use crate::store::{CacheState, RemovalCause};
use crate::task::sweeper::{self, SweepContext};
use crate::worker::PeriodicWorker;

use core::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

/// A thread-safe key/value cache with a pluggable eviction strategy, tag-based
/// invalidation and size accounting.
///
/// Values are stored behind an `Arc` so reads hand out cheap clones. A value's
/// size is the length of its JSON serialization, measured once on `set`.
pub struct EvictionableCache<V> {
  config: CacheConfig,
  state: Arc<RwLock<CacheState<V>>>,
  metrics: Arc<MetricCounters>,
  sweeper: Mutex<Option<PeriodicWorker>>,
}

impl<V> fmt::Debug for EvictionableCache<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.read();
    f.debug_struct("EvictionableCache")
      .field("strategy", &self.config.strategy)
      .field("entries", &state.len())
      .field("total_size", &state.total_size())
      .finish_non_exhaustive()
  }
}

impl<V> EvictionableCache<V>
where
  V: Serialize + Send + Sync + 'static,
{
  /// Builds a cache from a configuration and starts its expiration sweeper.
  pub fn new(config: CacheConfig) -> Result<Self, BuildError> {
    config.validate()?;

    let state = Arc::new(RwLock::new(CacheState::new(config.strategy)));
    let metrics = Arc::new(MetricCounters::new(config.enable_metrics));

    let context = SweepContext {
      state: state.clone(),
      metrics: metrics.clone(),
    };
    let sweeper = sweeper::spawn(context, config.cleanup_interval)
      .map_err(|e| BuildError::Spawn(e.to_string()))?;

    tracing::debug!(
      strategy = %config.strategy,
      max_entries = config.max_entries,
      max_size_bytes = config.max_size_bytes,
      "cache started"
    );

    Ok(Self {
      config,
      state,
      metrics,
      sweeper: Mutex::new(Some(sweeper)),
    })
  }

  pub fn builder() -> CacheBuilder {
    CacheBuilder::new()
  }

  /// Looks up `key`, counting exactly one hit or one miss.
  ///
  /// A hit refreshes the entry's access time and its standing with the
  /// eviction strategy. An entry found past its TTL is removed on the spot and
  /// counted as both a miss and an expiration.
  pub fn get(&self, key: &str) -> Option<Arc<V>> {
    let now = Instant::now();
    let mut state = self.state.write();

    let expired = match state.get(key) {
      Some(entry) => entry.is_expired_at(now),
      None => {
        drop(state);
        self.metrics.record_miss();
        return None;
      }
    };

    if expired {
      state.remove(key, RemovalCause::Expired);
      drop(state);
      self.metrics.record_miss();
      self.metrics.record_expirations(1);
      return None;
    }

    state.touch(key, now);
    let value = state.get(key).map(|entry| entry.value.clone());
    drop(state);

    self.metrics.record_hit();
    value
  }

  /// Reads a live value without counting it or touching recency/frequency.
  pub fn peek(&self, key: &str) -> Option<Arc<V>> {
    let state = self.state.read();
    state
      .get(key)
      .filter(|entry| !entry.is_expired_at(Instant::now()))
      .map(|entry| entry.value.clone())
  }

  /// Whether a live (unexpired) entry exists. Has no side effects.
  pub fn contains(&self, key: &str) -> bool {
    self.peek(key).is_some()
  }

  /// Inserts or replaces `key`.
  ///
  /// Values whose serialized size alone exceeds `max_size_bytes` are rejected
  /// and nothing is written. Otherwise entries are evicted until the new one
  /// fits; if the cache runs out of victims the entry is inserted anyway.
  pub fn set(&self, key: impl Into<String>, value: V, options: SetOptions) -> Result<()> {
    let key = key.into();
    let size = serde_json::to_vec(&value)
      .map_err(|e| CacheError::Serialization {
        key: key.clone(),
        reason: e.to_string(),
      })?
      .len() as u64;

    if size > self.config.max_size_bytes {
      return Err(CacheError::ValueTooLarge {
        key,
        size,
        max: self.config.max_size_bytes,
      });
    }

    let ttl = options.ttl.unwrap_or(self.config.default_ttl);
    let entry = CacheEntry::new(value, size, ttl, options);

    let evicted = {
      let mut state = self.state.write();
      state.insert(
        key,
        entry,
        self.config.max_entries,
        self.config.max_size_bytes,
      )
    };

    self.metrics.record_set();
    self.metrics.record_evictions(evicted);
    if evicted > 0 {
      tracing::trace!(evicted, strategy = %self.config.strategy, "evicted to make room");
    }
    Ok(())
  }

  /// Removes `key`. Returns whether an entry was removed.
  pub fn delete(&self, key: &str) -> bool {
    let removed = self.state.write().remove(key, RemovalCause::Deleted).is_some();
    if removed {
      self.metrics.record_delete();
    }
    removed
  }

  /// Removes every entry carrying `tag`. Returns how many entries went.
  pub fn invalidate_by_tag(&self, tag: &str) -> usize {
    let removed = self.state.write().invalidate_tag(tag);
    if removed > 0 {
      tracing::debug!(tag, removed, "cache entries invalidated by tag");
    }
    removed
  }

  /// Keys currently carrying `tag`, sorted.
  pub fn keys_for_tag(&self, tag: &str) -> Vec<String> {
    self.state.read().keys_for_tag(tag)
  }

  /// Describes an entry without reading its value.
  pub fn entry_info(&self, key: &str) -> Option<CacheEntryInfo> {
    let now = Instant::now();
    let state = self.state.read();
    state
      .get(key)
      .filter(|entry| !entry.is_expired_at(now))
      .map(|entry| entry.snapshot(key, now))
  }

  /// Drops every entry and resets the counters and strategy state.
  pub fn clear(&self) {
    let mut state = self.state.write();
    state.clear();
    self.metrics.reset();
  }

  /// Number of stored entries, expired-but-unswept ones included.
  pub fn len(&self) -> usize {
    self.state.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Runs an expiration sweep now instead of waiting for the sweeper.
  pub fn sweep_expired(&self) -> usize {
    sweeper::sweep(&SweepContext {
      state: self.state.clone(),
      metrics: self.metrics.clone(),
    })
  }

  /// Counters plus live entry count and total size.
  pub fn metrics(&self) -> MetricsSnapshot {
    let (entry_count, total_size) = {
      let state = self.state.read();
      (state.len(), state.total_size())
    };
    self.metrics.snapshot(entry_count, total_size)
  }

  pub fn config(&self) -> &CacheConfig {
    &self.config
  }

  /// Persistence hook. Logs the request; contents are never written.
  pub fn persist(&self) {
    if self.config.persistence.enabled {
      tracing::debug!(
        path = ?self.config.persistence.path,
        entries = self.len(),
        "cache persistence requested; not implemented"
      );
    }
  }

  /// Restore hook. Logs the request; nothing is loaded.
  pub fn restore(&self) {
    if self.config.persistence.enabled {
      tracing::debug!(
        path = ?self.config.persistence.path,
        "cache restore requested; not implemented"
      );
    }
  }

  /// Stops the sweeper and waits for it to exit. Idempotent.
  pub fn close(&self) -> Result<()> {
    let sweeper = self.sweeper.lock().take();
    match sweeper {
      Some(worker) => {
        self.persist();
        worker.stop()?;
        tracing::debug!("cache closed");
        Ok(())
      }
      None => Ok(()),
    }
  }
}
