use ballast_cache::{CacheBuilder, EvictionStrategy, SetOptions};
use std::thread;
use std::time::Duration;

fn main() {
  // A small LRU cache with a 2-second TTL swept every 500ms.
  let cache = CacheBuilder::new()
    .strategy(EvictionStrategy::Lru)
    .max_entries(2)
    .default_ttl(Duration::from_secs(2))
    .cleanup_interval(Duration::from_millis(500))
    .build::<String>()
    .expect("Failed to build cache");

  cache
    .set("user:1", "alice".to_string(), SetOptions::new().tag("users"))
    .unwrap();
  cache
    .set("user:2", "bob".to_string(), SetOptions::new().tag("users"))
    .unwrap();

  // Reading user:1 makes user:2 the least recently used entry.
  println!("user:1 = {:?}", cache.get("user:1"));
  cache
    .set("order:1", "pending".to_string(), SetOptions::new().tag("orders"))
    .unwrap();
  println!("user:2 after overflow = {:?}", cache.get("user:2"));

  println!("\nCache metrics: {:#?}", cache.metrics());

  println!("\nInvalidated {} 'users' entries.", cache.invalidate_by_tag("users"));

  println!("\nWaiting for the TTL to pass...");
  thread::sleep(Duration::from_secs(3));
  println!("Entries left after the sweep: {}", cache.len());

  cache.close().expect("sweeper panicked");
}
