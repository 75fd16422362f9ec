use std::borrow::Borrow;
use std::hash::Hash;

use ahash::{HashMap, HashMapExt};

#[derive(Debug, Clone, Copy)]
struct Frequency {
  count: u64,
  // Insertion order, used to break ties between equal counts.
  seq: u64,
}

/// Access counts per key.
///
/// The victim is the key with the lowest count; among equal counts the key
/// inserted earliest goes first, so eviction order is reproducible.
#[derive(Debug)]
pub(crate) struct LfuCounter<K: Eq + Hash + Clone> {
  counts: HashMap<K, Frequency>,
  next_seq: u64,
}

impl<K: Eq + Hash + Clone> LfuCounter<K> {
  pub(crate) fn new() -> Self {
    Self {
      counts: HashMap::new(),
      next_seq: 0,
    }
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.counts.len()
  }

  /// Starts tracking `key` with a zero count. Re-inserting resets its history.
  pub(crate) fn insert(&mut self, key: K) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.counts.insert(key, Frequency { count: 0, seq });
  }

  pub(crate) fn increment<Q>(&mut self, key: &Q)
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    if let Some(freq) = self.counts.get_mut(key) {
      freq.count = freq.count.saturating_add(1);
    }
  }

  #[cfg(test)]
  pub(crate) fn count<Q>(&self, key: &Q) -> Option<u64>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.counts.get(key).map(|freq| freq.count)
  }

  pub(crate) fn remove<Q>(&mut self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.counts.remove(key).is_some()
  }

  /// Removes and returns the least frequently used key.
  pub(crate) fn pop_min(&mut self) -> Option<K> {
    let victim = self
      .counts
      .iter()
      .min_by_key(|(_, freq)| (freq.count, freq.seq))
      .map(|(key, _)| key.clone())?;
    self.counts.remove(&victim);
    Some(victim)
  }

  pub(crate) fn clear(&mut self) {
    self.counts.clear();
    self.next_seq = 0;
  }
}
