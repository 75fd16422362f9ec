pub(crate) mod lfu;
pub(crate) mod lru_list;

use lfu::LfuCounter;
use lru_list::LruList;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which rule picks the entry to remove when the cache is full.
///
/// Chosen once when the cache is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
  /// Evict the least recently touched key.
  #[default]
  Lru,
  /// Evict the key with the fewest reads; ties go to the oldest insertion.
  Lfu,
  /// Never evict on write. Only the periodic sweep removes entries, so the
  /// cache can run over its limits between sweeps.
  Ttl,
}

impl fmt::Display for EvictionStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionStrategy::Lru => write!(f, "lru"),
      EvictionStrategy::Lfu => write!(f, "lfu"),
      EvictionStrategy::Ttl => write!(f, "ttl"),
    }
  }
}

impl FromStr for EvictionStrategy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "lru" => Ok(EvictionStrategy::Lru),
      "lfu" => Ok(EvictionStrategy::Lfu),
      "ttl" => Ok(EvictionStrategy::Ttl),
      other => Err(format!("unknown eviction strategy '{}'", other)),
    }
  }
}

/// The strategy's auxiliary state.
///
/// Lives beside the entry map inside the cache state and is only ever mutated
/// under the same write lock, so a key is tracked here iff it has an entry.
#[derive(Debug)]
pub(crate) enum EvictionPolicy {
  Lru(LruList<String>),
  Lfu(LfuCounter<String>),
  Ttl,
}

impl EvictionPolicy {
  pub(crate) fn new(strategy: EvictionStrategy) -> Self {
    match strategy {
      EvictionStrategy::Lru => EvictionPolicy::Lru(LruList::new()),
      EvictionStrategy::Lfu => EvictionPolicy::Lfu(LfuCounter::new()),
      EvictionStrategy::Ttl => EvictionPolicy::Ttl,
    }
  }

  /// Whether `set` may evict to make room.
  pub(crate) fn evicts_on_write(&self) -> bool {
    !matches!(self, EvictionPolicy::Ttl)
  }

  pub(crate) fn on_insert(&mut self, key: &str) {
    match self {
      EvictionPolicy::Lru(list) => list.push_front(key.to_string()),
      EvictionPolicy::Lfu(counter) => counter.insert(key.to_string()),
      EvictionPolicy::Ttl => {}
    }
  }

  pub(crate) fn on_access(&mut self, key: &str) {
    match self {
      EvictionPolicy::Lru(list) => list.move_to_front(key),
      EvictionPolicy::Lfu(counter) => counter.increment(key),
      EvictionPolicy::Ttl => {}
    }
  }

  pub(crate) fn on_remove(&mut self, key: &str) {
    match self {
      EvictionPolicy::Lru(list) => {
        list.remove(key);
      }
      EvictionPolicy::Lfu(counter) => {
        counter.remove(key);
      }
      EvictionPolicy::Ttl => {}
    }
  }

  /// Picks and stops tracking the next victim.
  pub(crate) fn pop_victim(&mut self) -> Option<String> {
    match self {
      EvictionPolicy::Lru(list) => list.pop_back(),
      EvictionPolicy::Lfu(counter) => counter.pop_min(),
      EvictionPolicy::Ttl => None,
    }
  }

  /// Number of keys tracked; always 0 for the TTL strategy.
  #[cfg(test)]
  pub(crate) fn tracked(&self) -> usize {
    match self {
      EvictionPolicy::Lru(list) => list.len(),
      EvictionPolicy::Lfu(counter) => counter.len(),
      EvictionPolicy::Ttl => 0,
    }
  }

  pub(crate) fn clear(&mut self) {
    match self {
      EvictionPolicy::Lru(list) => list.clear(),
      EvictionPolicy::Lfu(counter) => counter.clear(),
      EvictionPolicy::Ttl => {}
    }
  }
}
