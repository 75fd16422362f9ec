use crate::monitor::MonitorError;
use crate::pool::PoolError;

use ballast_cache::{CacheError, ErrorKind};
use thiserror::Error;

/// Errors returned by the performance manager.
#[derive(Debug, Error)]
pub enum ManagerError {
  #[error("module '{0}' has no recorded performance")]
  ModuleNotFound(String),

  #[error("the {0} component is disabled")]
  ComponentDisabled(&'static str),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Pool(#[from] PoolError),

  #[error(transparent)]
  Monitor(#[from] MonitorError),

  /// Every failure from one `close()`; all components were still closed.
  #[error("{} component(s) failed to close: {}", .0.len(), join(.0))]
  Close(Vec<ManagerError>),
}

fn join(errors: &[ManagerError]) -> String {
  errors
    .iter()
    .map(|e| e.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}

impl ManagerError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ManagerError::ModuleNotFound(_) => ErrorKind::NotFound,
      ManagerError::ComponentDisabled(_) => ErrorKind::Configuration,
      ManagerError::Cache(e) => e.kind(),
      ManagerError::Pool(e) => e.kind(),
      ManagerError::Monitor(e) => e.kind(),
      ManagerError::Close(_) => ErrorKind::Internal,
    }
  }
}
