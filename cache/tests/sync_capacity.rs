mod common;

use ballast_cache::{CacheBuilder, EvictionStrategy, EvictionableCache, SetOptions};
use common::{build_test_cache, put};

#[test]
fn test_lru_scenario_evicts_the_untouched_key() {
  let cache = build_test_cache(EvictionStrategy::Lru, 3);

  put(&cache, "a");
  put(&cache, "b");
  put(&cache, "c");
  assert!(cache.get("a").is_some());
  put(&cache, "d");

  assert!(cache.get("b").is_none(), "b was least recently touched");
  assert!(cache.get("a").is_some());
  assert!(cache.get("c").is_some());
  assert!(cache.get("d").is_some());
  assert_eq!(cache.metrics().evictions, 1);
  assert_eq!(cache.metrics().entry_count, 3);
}

#[test]
fn test_lru_overflow_removes_exactly_the_oldest_k() {
  let capacity = 5;
  let overflow = 3;
  let cache = build_test_cache(EvictionStrategy::Lru, capacity);

  for i in 0..capacity + overflow {
    put(&cache, &format!("k{}", i));
  }

  for i in 0..overflow {
    assert!(cache.peek(&format!("k{}", i)).is_none(), "k{} should be gone", i);
  }
  for i in overflow..capacity + overflow {
    assert!(cache.peek(&format!("k{}", i)).is_some(), "k{} should remain", i);
  }
  assert_eq!(cache.metrics().evictions, overflow as u64);
}

#[test]
fn test_lru_reads_protect_keys_from_eviction() {
  let cache = build_test_cache(EvictionStrategy::Lru, 4);
  for key in ["a", "b", "c", "d"] {
    put(&cache, key);
  }
  // Touch the two oldest; "c" and "d" become the eviction candidates.
  cache.get("a");
  cache.get("b");
  put(&cache, "e");
  put(&cache, "f");

  assert!(cache.peek("c").is_none());
  assert!(cache.peek("d").is_none());
  for key in ["a", "b", "e", "f"] {
    assert!(cache.peek(key).is_some(), "{} should remain", key);
  }
}

#[test]
fn test_byte_limit_evicts_until_the_new_value_fits() {
  // Each "value-kN" string serializes to 10 bytes including quotes.
  let cache: EvictionableCache<String> = CacheBuilder::new()
    .max_entries(100)
    .max_size_bytes(30)
    .build()
    .unwrap();

  for i in 0..3 {
    put(&cache, &format!("k{}", i));
  }
  assert_eq!(cache.metrics().total_size, 30);

  put(&cache, "k3");
  let m = cache.metrics();
  assert_eq!(m.entry_count, 3);
  assert_eq!(m.total_size, 30);
  assert!(cache.peek("k0").is_none());
}

#[test]
fn test_ttl_strategy_does_not_evict_on_write() {
  let cache = build_test_cache(EvictionStrategy::Ttl, 2);
  for key in ["a", "b", "c", "d"] {
    put(&cache, key);
  }
  let m = cache.metrics();
  assert_eq!(m.entry_count, 4, "pure TTL caches may run over capacity");
  assert_eq!(m.evictions, 0);
}

#[test]
fn test_replacing_a_key_is_not_an_eviction() {
  let cache = build_test_cache(EvictionStrategy::Lru, 2);
  put(&cache, "a");
  put(&cache, "b");
  cache
    .set("a", "replacement".to_string(), SetOptions::new())
    .unwrap();

  let m = cache.metrics();
  assert_eq!(m.entry_count, 2);
  assert_eq!(m.evictions, 0);
  assert_eq!(m.sets, 3);
  assert_eq!(cache.peek("a").as_deref().map(String::as_str), Some("replacement"));
}
