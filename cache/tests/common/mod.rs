#![allow(dead_code)]

use std::time::Duration;

use ballast_cache::{CacheBuilder, EvictionStrategy, EvictionableCache, SetOptions};

/// A sweep interval short enough that tests can wait out a few ticks.
pub const SWEEP_TICK: Duration = Duration::from_millis(20);

// Helper to build a string cache bounded only by entry count.
pub fn build_test_cache(strategy: EvictionStrategy, max_entries: usize) -> EvictionableCache<String> {
  CacheBuilder::new()
    .strategy(strategy)
    .max_entries(max_entries)
    .build()
    .unwrap()
}

// Helper to build a cache whose sweeper runs every `SWEEP_TICK`.
pub fn build_sweeping_cache(strategy: EvictionStrategy, ttl: Duration) -> EvictionableCache<String> {
  CacheBuilder::new()
    .strategy(strategy)
    .default_ttl(ttl)
    .cleanup_interval(SWEEP_TICK)
    .build()
    .unwrap()
}

pub fn put(cache: &EvictionableCache<String>, key: &str) {
  cache
    .set(key, format!("value-{}", key), SetOptions::new())
    .unwrap();
}

pub fn put_tagged(cache: &EvictionableCache<String>, key: &str, tags: &[&str]) {
  cache
    .set(
      key,
      format!("value-{}", key),
      SetOptions::new().tags(tags.iter().copied()),
    )
    .unwrap();
}
