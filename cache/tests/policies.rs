// cache/tests/policies.rs

mod common;

use ballast_cache::EvictionStrategy;
use common::{build_test_cache, put};

// --- LFU Policy Tests ---
mod lfu {
  use super::*;

  #[test]
  fn test_lfu_evicts_least_read_key() {
    let cache = build_test_cache(EvictionStrategy::Lfu, 3);
    put(&cache, "a");
    put(&cache, "b");
    put(&cache, "c");

    for _ in 0..3 {
      cache.get("a");
    }
    cache.get("c");

    put(&cache, "d");
    assert!(cache.peek("b").is_none(), "b has never been read");
    assert!(cache.peek("a").is_some());
    assert!(cache.peek("c").is_some());
    assert!(cache.peek("d").is_some());
  }

  #[test]
  fn test_lfu_ties_evict_oldest_insertion() {
    let cache = build_test_cache(EvictionStrategy::Lfu, 2);
    put(&cache, "first");
    put(&cache, "second");
    put(&cache, "third");

    assert!(cache.peek("first").is_none());
    assert!(cache.peek("second").is_some());
    assert!(cache.peek("third").is_some());
  }

  #[test]
  fn test_lfu_new_key_can_be_next_victim() {
    let cache = build_test_cache(EvictionStrategy::Lfu, 2);
    put(&cache, "a");
    put(&cache, "b");
    cache.get("a");
    cache.get("b");

    put(&cache, "c");
    put(&cache, "d");

    // "c" was never read, so it loses to the older but busier keys.
    assert!(cache.peek("c").is_none());
    assert!(cache.peek("d").is_some());
  }
}

// --- LRU Policy Tests ---
mod lru {
  use super::*;

  #[test]
  fn test_lru_eviction_logic() {
    let cache = build_test_cache(EvictionStrategy::Lru, 3);
    put(&cache, "1");
    put(&cache, "2");
    put(&cache, "3");

    cache.get("1");
    put(&cache, "4");

    assert_eq!(cache.metrics().entry_count, 3);
    assert!(cache.get("2").is_none(), "Key 2 should have been evicted");
    assert!(cache.get("1").is_some());
    assert!(cache.get("3").is_some());
    assert!(cache.get("4").is_some());
  }
}
