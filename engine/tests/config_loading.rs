use ballast::cache::EvictionStrategy;
use ballast::pool::{ResourceHandle, ResourceType};
use ballast::{ConfigError, EngineConfig, PerformanceManager};

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

const FULL_CONFIG: &str = r#"
logging:
  filter: "info,ballast::pool=debug"
  json: true
cache:
  strategy: lfu
  max_entries: 500
  max_size_bytes: 1048576
  default_ttl: 10m
  cleanup_interval: 30s
pool:
  max_total_resources: 40
  max_memory_mb: 512
  idle_timeout: 2m
  resource_types:
    database:
      max_size: 8
      acquire_timeout: 5s
    background-task:
      max_size: 4
      idle_timeout: 1m
monitor:
  sampling_interval: 1h
  retention_period: 6h
  dedupe_alerts: false
  thresholds:
    - metric_name: search_request_time
      warning: 100
      critical: 250
      unit: ms
"#;

#[test]
fn test_full_config_is_processed() {
  let config = EngineConfig::from_yaml_str(FULL_CONFIG).unwrap();

  assert_eq!(config.logging.filter, "info,ballast::pool=debug");
  assert!(config.logging.json);
  assert!(config.logging.ansi);

  let cache = config.cache.unwrap();
  assert_eq!(cache.strategy, EvictionStrategy::Lfu);
  assert_eq!(cache.max_entries, 500);
  assert_eq!(cache.default_ttl, Duration::from_secs(600));

  let pool = config.pool.unwrap();
  assert_eq!(pool.max_total_resources, 40);
  assert_eq!(pool.max_memory_bytes(), 512 * 1024 * 1024);
  let kinds: Vec<ResourceType> = pool.resource_types.keys().copied().collect();
  assert_eq!(kinds, vec![ResourceType::Database, ResourceType::BackgroundTask]);
  let db = &pool.resource_types[&ResourceType::Database];
  assert_eq!(db.max_size, 8);
  assert_eq!(db.idle_timeout, Duration::from_secs(120), "inherits the pool idle timeout");
  assert_eq!(pool.acquire_timeout_for(ResourceType::Database), Duration::from_secs(5));
  assert_eq!(
    pool.resource_types[&ResourceType::BackgroundTask].idle_timeout,
    Duration::from_secs(60)
  );

  let monitor = config.monitor.unwrap();
  assert_eq!(monitor.retention_period, Duration::from_secs(6 * 3600));
  assert!(!monitor.dedupe_alerts);
  assert_eq!(monitor.thresholds.len(), 1);
  assert_eq!(monitor.thresholds[0].critical, 250.0);
}

#[test]
fn test_empty_document_uses_defaults() {
  let config = EngineConfig::from_yaml_str("{}").unwrap();
  let defaults = EngineConfig::default();
  assert_eq!(config.logging, defaults.logging);
  assert_eq!(config.cache, defaults.cache);
  assert_eq!(config.monitor, defaults.monitor);
  assert_eq!(config.pool.unwrap().resource_types.len(), ResourceType::ALL.len());
}

#[test]
fn test_unknown_fields_are_rejected() {
  let err = EngineConfig::from_yaml_str("cache:\n  max_entrys: 10\n").unwrap_err();
  assert!(matches!(err, ConfigError::Parse(_)), "{:?}", err);
}

#[test]
fn test_invalid_values_name_their_field() {
  let cases = [
    ("cache:\n  strategy: random\n", "cache.strategy"),
    ("cache:\n  max_entries: 0\n", "cache.max_entries"),
    ("pool:\n  acquire_timeout: 0s\n", "pool.acquire_timeout"),
    ("pool:\n  idle_timeout: later\n", "pool.idle_timeout"),
    (
      "pool:\n  resource_types:\n    database:\n      max_size: 0\n",
      "pool.resource_types.database.max_size",
    ),
    ("monitor:\n  max_metrics: 0\n", "monitor.max_metrics"),
    (
      "cache:\n  persistence:\n    enabled: true\n",
      "cache.persistence.path",
    ),
  ];

  for (yaml, expected) in cases {
    match EngineConfig::from_yaml_str(yaml) {
      Err(ConfigError::InvalidConfigValue { field, .. }) => assert_eq!(field, expected, "{}", yaml),
      other => panic!("{}: unexpected {:?}", yaml, other),
    }
  }
}

#[test]
fn test_config_is_read_from_a_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  file.write_all(FULL_CONFIG.as_bytes()).unwrap();

  let config = EngineConfig::from_file(file.path()).unwrap();
  assert_eq!(config.pool.unwrap().max_total_resources, 40);
}

#[test]
fn test_missing_file_is_a_read_error() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("absent.yaml");
  match EngineConfig::from_file(&path) {
    Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
    other => panic!("unexpected: {:?}", other),
  }
}

#[tokio::test]
async fn test_loaded_config_accepts_factories() {
  let config = EngineConfig::from_yaml_str(FULL_CONFIG)
    .unwrap()
    .map_pool(|pool| {
      pool.with_factory(ResourceType::Database, |_| {
        Ok(Arc::new(String::from("db-connection")) as ResourceHandle)
      })
    });
  let manager = PerformanceManager::new(config).unwrap();

  let pool = manager.pool().unwrap();
  let token = tokio_util::sync::CancellationToken::new();
  let resource = pool
    .acquire(&token, ResourceType::Database, Default::default())
    .await
    .unwrap();
  let handle = resource.handle_as::<String>().unwrap();
  assert_eq!(handle.as_str(), "db-connection");
  pool.release(resource).unwrap();
  manager.close().unwrap();
}
