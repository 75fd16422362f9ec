//! An in-process cache with pluggable eviction, tag invalidation and size
//! accounting.
//!
//! # Features
//! - **Three strategies**: least-recently-used, least-frequently-used, or
//!   pure time-to-live where only the background sweep frees space.
//! - **Tags**: label entries on `set` and drop every entry with a label at once.
//! - **Size accounting**: each value's size is its serialized length; the cache
//!   keeps both an entry limit and a byte limit.
//! - **Observability**: lock-free hit/miss/eviction counters with a derived hit rate.
//! - **Cooperative shutdown**: the sweeper is a stoppable worker joined on `close()`.

// Public modules that form the API
pub mod builder;
pub mod cache;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod worker;

// Internal, crate-only modules
mod store;
mod task;

// Re-export the primary user-facing types for convenience
pub use builder::{CacheBuilder, CacheConfig, PersistenceConfig};
pub use cache::EvictionableCache;
pub use entry::{CacheEntryInfo, SetOptions};
pub use error::{BuildError, CacheError, ErrorKind, WorkerPanic};
pub use metrics::{MetricCounters, MetricsSnapshot};
pub use policy::EvictionStrategy;
pub use worker::{PeriodicWorker, StopSignal};
