use crate::config::ConfigError;
use crate::manager::ManagerError;
use crate::monitor::MonitorError;
use crate::pool::PoolError;

use ballast_cache::{BuildError, CacheError, ErrorKind};
use thiserror::Error;

/// The error type user callbacks (resource factories and cleanups) return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Any error produced by a ballast component.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Pool(#[from] PoolError),

  #[error(transparent)]
  Monitor(#[from] MonitorError),

  #[error(transparent)]
  Manager(#[from] ManagerError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("Failed to initialize tracing_log bridge: {0}")]
  LogBridgeInit(String),

  #[error("Failed to set global tracing subscriber: {0}")]
  GlobalSubscriberSet(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Cache(e) => e.kind(),
      Error::Pool(e) => e.kind(),
      Error::Monitor(e) => e.kind(),
      Error::Manager(e) => e.kind(),
      Error::Config(_) => ErrorKind::Configuration,
      Error::LogBridgeInit(_) | Error::GlobalSubscriberSet(_) => ErrorKind::Configuration,
    }
  }
}

impl From<BuildError> for Error {
  fn from(err: BuildError) -> Self {
    Error::Cache(CacheError::Build(err))
  }
}

/// A specialized `Result` type for ballast operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
