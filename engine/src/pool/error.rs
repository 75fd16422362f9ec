use super::resource::ResourceType;
use crate::config::ConfigError;
use crate::error::BoxError;

use std::time::Duration;

use ballast_cache::{ErrorKind, WorkerPanic};
use thiserror::Error;

/// Errors returned by the resource pool.
#[derive(Debug, Error)]
pub enum PoolError {
  #[error("resource type '{0}' is not configured")]
  TypeNotConfigured(ResourceType),

  #[error("no '{kind}' resource became available within {waited:?}")]
  Exhausted { kind: ResourceType, waited: Duration },

  #[error("acquisition of a '{0}' resource was cancelled")]
  Cancelled(ResourceType),

  #[error("resource pool is closed")]
  Closed,

  #[error("failed to create a '{kind}' resource: {source}")]
  Creation {
    kind: ResourceType,
    #[source]
    source: BoxError,
  },

  #[error("{} resource cleanup failure(s): {}", failures.len(), failures.join("; "))]
  Cleanup { failures: Vec<String> },

  #[error("failed to spawn pool worker: {0}")]
  Spawn(String),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl PoolError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      PoolError::TypeNotConfigured(_) => ErrorKind::Configuration,
      PoolError::Exhausted { .. } => ErrorKind::Timeout,
      PoolError::Cancelled(_) => ErrorKind::Cancelled,
      PoolError::Closed => ErrorKind::Closed,
      PoolError::Creation { .. } => ErrorKind::Internal,
      PoolError::Cleanup { .. } => ErrorKind::Internal,
      PoolError::Spawn(_) => ErrorKind::Internal,
      PoolError::Config(_) => ErrorKind::Configuration,
    }
  }
}

impl From<WorkerPanic> for PoolError {
  fn from(panic: WorkerPanic) -> Self {
    PoolError::Cleanup {
      failures: vec![panic.to_string()],
    }
  }
}
