use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Per-call options for [`crate::EvictionableCache::set`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
  /// Overrides the cache's default time-to-live for this entry.
  pub ttl: Option<Duration>,
  /// Labels for bulk invalidation.
  pub tags: Vec<String>,
  /// Free-form annotations carried with the entry.
  pub metadata: HashMap<String, String>,
}

impl SetOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn ttl(mut self, ttl: Duration) -> Self {
    self.ttl = Some(ttl);
    self
  }

  pub fn tag(mut self, tag: impl Into<String>) -> Self {
    self.tags.push(tag.into());
    self
  }

  pub fn tags<I, S>(mut self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tags.extend(tags.into_iter().map(Into::into));
    self
  }

  pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.metadata.insert(key.into(), value.into());
    self
  }
}

/// A container for a value in the cache, holding all necessary metadata.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
  /// The user's value, wrapped in an Arc so reads never clone it.
  pub(crate) value: Arc<V>,
  pub(crate) created_at: Instant,
  pub(crate) accessed_at: Instant,
  pub(crate) ttl: Duration,
  pub(crate) access_count: u64,
  /// Serialized size in bytes.
  pub(crate) size: u64,
  pub(crate) tags: BTreeSet<String>,
  pub(crate) metadata: HashMap<String, String>,
}

impl<V> CacheEntry<V> {
  pub(crate) fn new(value: V, size: u64, ttl: Duration, options: SetOptions) -> Self {
    let now = Instant::now();
    Self {
      value: Arc::new(value),
      created_at: now,
      accessed_at: now,
      ttl,
      access_count: 0,
      size,
      tags: options.tags.into_iter().collect(),
      metadata: options.metadata,
    }
  }

  /// An entry is expired once strictly more than its TTL has passed since creation.
  #[inline]
  pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.created_at) > self.ttl
  }

  /// Records a read: bumps the access count and the access time.
  #[inline]
  pub(crate) fn touch(&mut self, now: Instant) {
    self.accessed_at = now;
    self.access_count += 1;
  }

  pub(crate) fn snapshot(&self, key: &str, now: Instant) -> CacheEntryInfo {
    CacheEntryInfo {
      key: key.to_string(),
      age: now.saturating_duration_since(self.created_at),
      idle: now.saturating_duration_since(self.accessed_at),
      ttl: self.ttl,
      access_count: self.access_count,
      size: self.size,
      tags: self.tags.iter().cloned().collect(),
      metadata: self.metadata.clone(),
    }
  }
}

/// Everything about an entry except its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryInfo {
  pub key: String,
  /// Time since the entry was set.
  pub age: Duration,
  /// Time since the entry was last read (or set, if never read).
  pub idle: Duration,
  pub ttl: Duration,
  pub access_count: u64,
  pub size: u64,
  pub tags: Vec<String>,
  pub metadata: HashMap<String, String>,
}
