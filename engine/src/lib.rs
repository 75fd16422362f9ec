//! In-process resource and performance engine.
//!
//! # Components
//! - **Cache**: [`cache::EvictionableCache`], tagged and size-accounted, with
//!   LRU, LFU or pure-TTL eviction.
//! - **Resource pool**: [`ResourcePool`] hands out typed resources under
//!   per-type, global and memory limits, queueing callers in FIFO order.
//! - **Monitor**: [`PerformanceMonitor`] keeps bounded metric histories,
//!   evaluates thresholds and raises alerts.
//! - **Manager**: [`PerformanceManager`] owns the three, tracks per-module
//!   statistics and produces reports with recommendations.
//!
//! Every component runs its background work on stoppable worker threads that
//! are joined when the component is closed.

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod monitor;
pub mod pool;
pub mod probe;
pub mod reclaim;

pub use ballast_cache as cache;

pub use config::{ConfigError, EngineConfig};
pub use error::{BoxError, Error, Result};
pub use logging::LoggingConfig;
pub use manager::{ManagerError, ModulePerformance, PerformanceManager, PerformanceReport};
pub use monitor::{
  AlertSeverity, AlertSink, MonitorConfig, MonitorError, PerformanceAlert, PerformanceMetric,
  PerformanceMonitor, PerformanceThreshold, SystemMetrics, TracingAlertSink,
};
pub use pool::{
  PoolConfig, PoolError, PoolMetrics, Resource, ResourcePool, ResourceType, ResourceTypeConfig,
  TypeStats,
};
pub use probe::{FixedProbe, ProcessProbe, ProcessSample, SysinfoProbe};
pub use reclaim::ReclaimStats;
