use crate::config::ConfigError;

use ballast_cache::ErrorKind;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by the performance monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
  #[error("alert '{0}' not found")]
  AlertNotFound(Uuid),

  #[error("invalid threshold for '{metric}': {reason}")]
  InvalidThreshold { metric: String, reason: String },

  #[error("failed to spawn monitor worker: {0}")]
  Spawn(String),

  #[error("{} failure(s) while closing the monitor: {}", failures.len(), failures.join("; "))]
  Shutdown { failures: Vec<String> },

  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl MonitorError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      MonitorError::AlertNotFound(_) => ErrorKind::NotFound,
      MonitorError::InvalidThreshold { .. } => ErrorKind::Configuration,
      MonitorError::Spawn(_) => ErrorKind::Internal,
      MonitorError::Shutdown { .. } => ErrorKind::Internal,
      MonitorError::Config(_) => ErrorKind::Configuration,
    }
  }
}
