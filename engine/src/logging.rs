//! Process-wide logging setup.
//!
//! Components log through `tracing` whether or not this is called; [`init`]
//! only installs a subscriber for applications that do not bring their own.

use crate::error::{Error, Result};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Default filter directive.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
  /// An `EnvFilter` directive. `RUST_LOG` takes precedence when set.
  pub filter: String,
  /// Emit one JSON object per event instead of human-readable lines.
  pub json: bool,
  pub ansi: bool,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      filter: DEFAULT_FILTER.to_string(),
      json: false,
      ansi: true,
    }
  }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(&config.filter))
}

fn configured_filter(directives: &str) -> EnvFilter {
  EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber and bridges `log` records into it.
///
/// Fails if a global subscriber or a `log` logger is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
  let filter = build_filter(config);

  if config.json {
    let subscriber = Registry::default()
      .with(filter)
      .with(fmt::layer().json().with_ansi(false));
    tracing::subscriber::set_global_default(subscriber)
      .map_err(|e| Error::GlobalSubscriberSet(e.to_string()))?;
  } else {
    let subscriber = Registry::default()
      .with(filter)
      .with(fmt::layer().with_ansi(config.ansi));
    tracing::subscriber::set_global_default(subscriber)
      .map_err(|e| Error::GlobalSubscriberSet(e.to_string()))?;
  }

  tracing_log::LogTracer::init().map_err(|e| Error::LogBridgeInit(e.to_string()))?;

  tracing::debug!(target: "ballast::logging", filter = %config.filter, json = config.json, "logging initialized");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_plain_info() {
    let config = LoggingConfig::default();
    assert_eq!(config.filter, "info");
    assert!(!config.json);
    assert!(config.ansi);
  }

  #[test]
  fn unparsable_filter_falls_back() {
    use tracing_subscriber::filter::LevelFilter;

    let filter = configured_filter("ballast=loud");
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));

    let filter = configured_filter("debug");
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
  }
}
