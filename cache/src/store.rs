use crate::entry::CacheEntry;
use crate::policy::{EvictionPolicy, EvictionStrategy};

use std::collections::HashSet;
use std::time::Instant;

use ahash::{HashMap, HashMapExt};

/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemovalCause {
  Deleted,
  Invalidated,
  Replaced,
  Evicted,
  Expired,
}

/// Everything the cache lock protects.
///
/// The entry map, the strategy's auxiliary state, the tag index and the size
/// total only change together, through the methods below, while the caller
/// holds the write lock.
#[derive(Debug)]
pub(crate) struct CacheState<V> {
  entries: HashMap<String, CacheEntry<V>>,
  policy: EvictionPolicy,
  tags: HashMap<String, HashSet<String>>,
  total_size: u64,
}

impl<V> CacheState<V> {
  pub(crate) fn new(strategy: EvictionStrategy) -> Self {
    Self {
      entries: HashMap::new(),
      policy: EvictionPolicy::new(strategy),
      tags: HashMap::new(),
      total_size: 0,
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }

  pub(crate) fn total_size(&self) -> u64 {
    self.total_size
  }

  pub(crate) fn get(&self, key: &str) -> Option<&CacheEntry<V>> {
    self.entries.get(key)
  }

  #[cfg(test)]
  pub(crate) fn contains_key(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub(crate) fn keys_for_tag(&self, tag: &str) -> Vec<String> {
    let mut keys: Vec<String> = self
      .tags
      .get(tag)
      .map(|keys| keys.iter().cloned().collect())
      .unwrap_or_default();
    keys.sort();
    keys
  }

  /// Records a read against the strategy.
  pub(crate) fn touch(&mut self, key: &str, now: Instant) {
    if let Some(entry) = self.entries.get_mut(key) {
      entry.touch(now);
      self.policy.on_access(key);
    }
  }

  /// Inserts a new entry, evicting first if the strategy allows it.
  ///
  /// Returns the number of entries evicted to make room. When nothing is left
  /// to evict the entry is inserted anyway and the limits are overrun.
  pub(crate) fn insert(
    &mut self,
    key: String,
    entry: CacheEntry<V>,
    max_entries: usize,
    max_size: u64,
  ) -> u64 {
    self.remove(&key, RemovalCause::Replaced);

    let mut evicted = 0;
    if self.policy.evicts_on_write() {
      while self.entries.len() + 1 > max_entries || self.total_size + entry.size > max_size {
        match self.policy.pop_victim() {
          Some(victim) => {
            self.detach(&victim);
            tracing::trace!(key = %victim, cause = ?RemovalCause::Evicted, "cache entry removed");
            evicted += 1;
          }
          None => break,
        }
      }
    }

    for tag in &entry.tags {
      self
        .tags
        .entry(tag.clone())
        .or_default()
        .insert(key.clone());
    }
    self.total_size += entry.size;
    self.policy.on_insert(&key);
    self.entries.insert(key, entry);

    evicted
  }

  /// Removes one entry and all of its bookkeeping.
  pub(crate) fn remove(&mut self, key: &str, cause: RemovalCause) -> Option<CacheEntry<V>> {
    let entry = self.detach(key)?;
    self.policy.on_remove(key);
    tracing::trace!(key, ?cause, "cache entry removed");
    Some(entry)
  }

  /// Removes every entry carrying `tag` and returns how many went.
  pub(crate) fn invalidate_tag(&mut self, tag: &str) -> usize {
    let keys = match self.tags.remove(tag) {
      Some(keys) => keys,
      None => return 0,
    };
    keys
      .iter()
      .filter(|key| self.remove(key, RemovalCause::Invalidated).is_some())
      .count()
  }

  /// Removes every entry whose TTL has elapsed at `now`.
  pub(crate) fn remove_expired(&mut self, now: Instant) -> usize {
    let expired: Vec<String> = self
      .entries
      .iter()
      .filter(|(_, entry)| entry.is_expired_at(now))
      .map(|(key, _)| key.clone())
      .collect();

    for key in &expired {
      self.remove(key, RemovalCause::Expired);
    }
    expired.len()
  }

  pub(crate) fn clear(&mut self) {
    self.entries.clear();
    self.tags.clear();
    self.policy.clear();
    self.total_size = 0;
  }

  /// Takes the entry out of the map, the tag index and the size total.
  /// Policy bookkeeping is left to the caller.
  fn detach(&mut self, key: &str) -> Option<CacheEntry<V>> {
    let entry = self.entries.remove(key)?;
    for tag in &entry.tags {
      if let Some(keys) = self.tags.get_mut(tag) {
        keys.remove(key);
        if keys.is_empty() {
          self.tags.remove(tag);
        }
      }
    }
    self.total_size = self.total_size.saturating_sub(entry.size);
    Some(entry)
  }

  #[cfg(test)]
  pub(crate) fn assert_consistent(&self) {
    if self.policy.evicts_on_write() {
      assert_eq!(self.policy.tracked(), self.entries.len());
    }
    let size: u64 = self.entries.values().map(|e| e.size).sum();
    assert_eq!(size, self.total_size);
    for (tag, keys) in &self.tags {
      for key in keys {
        let entry = self.entries.get(key).expect("tagged key must exist");
        assert!(entry.tags.contains(tag));
      }
    }
  }
}
