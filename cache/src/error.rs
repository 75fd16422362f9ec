use std::time::Duration;

use thiserror::Error;

/// The broad failure classes shared by every ballast component.
///
/// Component errors stay specific; `kind()` folds them into this taxonomy so
/// callers can branch on the class of failure without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  /// An unknown module, alert or resource.
  NotFound,
  /// A value too large for the cache, or a pool with no room left.
  CapacityExceeded,
  /// A bounded wait ran out.
  Timeout,
  /// The caller gave up.
  Cancelled,
  /// Something was asked of a component that was never configured for it.
  Configuration,
  /// The component has been shut down.
  Closed,
  /// A background task or user callback failed.
  Internal,
}

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// The cache was configured with a zero entry limit or a zero byte limit.
  #[error("cache capacity cannot be zero")]
  ZeroCapacity,
  /// The sweep interval was zero, which would spin the sweeper.
  #[error("cleanup interval cannot be zero")]
  ZeroInterval,
  /// The operating system refused to start the sweeper thread.
  #[error("failed to spawn cache sweeper: {0}")]
  Spawn(String),
}

/// Errors returned by cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
  #[error("value for key '{key}' is {size} bytes, exceeding the cache limit of {max} bytes")]
  ValueTooLarge { key: String, size: u64, max: u64 },

  #[error("failed to measure value for key '{key}': {reason}")]
  Serialization { key: String, reason: String },

  #[error("cache worker '{0}' panicked")]
  WorkerPanicked(&'static str),

  #[error(transparent)]
  Build(#[from] BuildError),
}

impl CacheError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      CacheError::ValueTooLarge { .. } => ErrorKind::CapacityExceeded,
      CacheError::Serialization { .. } => ErrorKind::Internal,
      CacheError::WorkerPanicked(_) => ErrorKind::Internal,
      CacheError::Build(_) => ErrorKind::Configuration,
    }
  }
}

/// Returned by a [`crate::worker::PeriodicWorker`] whose thread panicked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("worker '{name}' panicked after running for {ran_for:?}")]
pub struct WorkerPanic {
  pub name: &'static str,
  pub ran_for: Duration,
}

impl From<WorkerPanic> for CacheError {
  fn from(panic: WorkerPanic) -> Self {
    CacheError::WorkerPanicked(panic.name)
  }
}

/// A specialized `Result` type for cache operations.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;
