mod common;

use ballast::cache::{ErrorKind, SetOptions};
use ballast::pool::{PoolConfig, ResourceType};
use ballast::{
  AlertSeverity, EngineConfig, FixedProbe, ManagerError, PerformanceManager, PerformanceThreshold,
};
use common::{no_metadata, quiet_monitor_config, RecordingSink, QUIET};

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

const GIB: u64 = 1024 * 1024 * 1024;

fn engine_config() -> EngineConfig {
  EngineConfig {
    pool: Some(PoolConfig {
      cleanup_interval: QUIET,
      ..PoolConfig::default()
    }),
    monitor: Some(quiet_monitor_config()),
    ..EngineConfig::default()
  }
}

fn build_manager(config: EngineConfig) -> (PerformanceManager, Arc<FixedProbe>) {
  let probe = Arc::new(FixedProbe::new(64 * 1024 * 1024));
  let manager =
    PerformanceManager::with_parts(config, probe.clone(), Arc::new(RecordingSink::default()))
      .unwrap();
  (manager, probe)
}

fn ms(millis: u64) -> Duration {
  Duration::from_millis(millis)
}

#[test]
fn test_module_statistics_accumulate() {
  let (manager, _) = build_manager(engine_config());

  manager.record_module_performance("checkout", ms(10), true);
  manager.record_module_performance("checkout", ms(30), false);
  manager.record_cache_hit("checkout");
  manager.record_cache_miss("checkout");
  manager.record_cache_miss("search");

  let checkout = manager.module_performance("checkout").unwrap();
  assert_eq!(checkout.request_count, 2);
  assert_eq!(checkout.error_count, 1);
  assert_eq!(checkout.total_latency, ms(40));
  assert_eq!(checkout.average_latency, ms(20));
  assert_eq!(checkout.error_rate(), 0.5);
  assert_eq!(checkout.cache_hit_rate(), Some(0.5));

  assert_eq!(manager.list_modules(), vec!["checkout", "search"]);
  assert!(manager.module_performance("billing").is_none());
}

#[test]
fn test_module_latency_is_forwarded_to_the_monitor() {
  let (manager, _) = build_manager(engine_config());
  manager.record_module_performance("search", ms(12), true);

  let samples = manager
    .monitor()
    .unwrap()
    .get_metrics("search_request_time", 0);
  assert_eq!(samples.len(), 1);
  assert_eq!(samples[0].value, 12.0);
  assert_eq!(samples[0].unit, "ms");
  assert_eq!(samples[0].tags["module"], "search");
  assert_eq!(samples[0].tags["success"], "true");
}

#[test]
fn test_healthy_system_gets_no_recommendations() {
  let (manager, _) = build_manager(engine_config());
  manager.record_module_performance("search", ms(5), true);

  let report = manager.generate_report();
  assert!(report.recommendations.is_empty(), "{:?}", report.recommendations);
  assert_eq!(report.system.memory_bytes, 64 * 1024 * 1024);
  assert!(report.cache.is_some());
  assert!(report.pool.is_some());
}

#[test]
fn test_report_flags_cache_memory_and_modules() {
  let (manager, probe) = build_manager(engine_config());

  let cache = manager.cache().unwrap();
  cache.set("user:1", json!({"name": "ada"}), SetOptions::new()).unwrap();
  assert!(cache.get("user:1").is_some());
  for key in ["user:2", "user:3", "user:4"] {
    assert!(cache.get(key).is_none());
  }

  probe.set(2 * GIB);
  for success in [true, false, false] {
    manager.record_module_performance("search", ms(150), success);
  }
  manager.record_module_performance("auth", ms(1), true);

  let report = manager.generate_report();
  let names: Vec<&str> = report.modules.iter().map(|m| m.name.as_str()).collect();
  assert_eq!(names, vec!["auth", "search"]);

  let recs = &report.recommendations;
  assert_eq!(recs.len(), 4, "{:?}", recs);
  assert!(recs[0].starts_with("Cache hit rate is 25.0%"));
  assert!(recs[1].starts_with("Memory usage is 2048 MB, above the configured 1024 MB"));
  assert!(recs[2].starts_with("Module 'search' averages 150.0 ms"));
  assert!(recs[3].starts_with("Module 'search' fails 66.7%"));
}

#[test]
fn test_report_carries_unresolved_alerts() {
  let (manager, _) = build_manager(engine_config());
  manager
    .monitor()
    .unwrap()
    .add_threshold(PerformanceThreshold::new("search_request_time", 100.0, 200.0, "ms"))
    .unwrap();

  manager.record_module_performance("search", ms(150), true);
  let report = manager.generate_report();
  assert_eq!(report.alerts.len(), 1);
  assert_eq!(report.alerts[0].severity, AlertSeverity::Warning);

  manager.resolve_alert(report.alerts[0].id).unwrap();
  assert!(manager.generate_report().alerts.is_empty());
  assert_eq!(manager.alerts(true).len(), 1);
}

#[test]
fn test_report_serializes_latencies_in_milliseconds() {
  let (manager, _) = build_manager(engine_config());
  manager.record_module_performance("search", ms(250), true);

  let value = serde_json::to_value(manager.generate_report()).unwrap();
  assert_eq!(value["modules"][0]["name"], "search");
  assert_eq!(value["modules"][0]["average_latency_ms"], 250.0);
  assert!(value["recommendations"].is_array());
}

#[test]
fn test_optimize_module_suggests_without_applying() {
  let (manager, _) = build_manager(engine_config());

  manager.record_module_performance("fast", ms(2), true);
  assert!(manager.optimize_module("fast").unwrap().is_empty());

  manager.record_module_performance("slow", ms(400), false);
  manager.record_cache_miss("slow");
  let suggestions = manager.optimize_module("slow").unwrap();
  assert_eq!(suggestions.len(), 3, "{:?}", suggestions);
  assert!(suggestions[0].starts_with("Average latency of 400.0 ms exceeds 100 ms"));
  assert!(suggestions[1].starts_with("Error rate of 100.0% exceeds 5%"));
  assert!(suggestions[2].starts_with("Cache hit rate of 0.0% is low"));

  // Suggestions leave the recorded statistics untouched.
  assert_eq!(manager.module_performance("slow").unwrap().request_count, 1);
}

#[test]
fn test_optimizing_an_unknown_module_fails() {
  let (manager, _) = build_manager(engine_config());
  let err = manager.optimize_module("ghost").unwrap_err();
  assert!(matches!(err, ManagerError::ModuleNotFound(ref name) if name == "ghost"));
  assert_eq!(err.kind(), ErrorKind::NotFound);

  manager.record_cache_hit("lookups");
  manager.record_cache_miss("lookups");
  assert!(manager.list_modules().contains(&"lookups".to_string()));
  let err = manager.optimize_module("lookups").unwrap_err();
  assert!(matches!(err, ManagerError::ModuleNotFound(ref name) if name == "lookups"));

  manager.record_module_performance("lookups", ms(3), true);
  assert!(manager.optimize_module("lookups").is_ok());
}

#[test]
fn test_disabled_components_are_absent() {
  let config = EngineConfig {
    cache: None,
    pool: None,
    monitor: None,
    ..EngineConfig::default()
  };
  let (manager, _) = build_manager(config);

  assert!(manager.cache().is_none());
  assert!(manager.pool_metrics().is_none());
  assert!(manager.alerts(false).is_empty());

  manager.record_module_performance("search", ms(5), true);
  let report = manager.generate_report();
  assert!(report.cache.is_none());
  assert!(report.pool.is_none());
  assert_eq!(report.system.memory_bytes, 64 * 1024 * 1024);

  let err = manager.resolve_alert(uuid::Uuid::new_v4()).unwrap_err();
  assert!(matches!(err, ManagerError::ComponentDisabled("monitor")));
  assert_eq!(err.kind(), ErrorKind::Configuration);

  manager.close().unwrap();
}

#[tokio::test]
async fn test_pool_is_shared_through_the_manager() {
  let (manager, _) = build_manager(engine_config());
  let pool = manager.pool().unwrap();

  let resource = pool
    .acquire(&CancellationToken::new(), ResourceType::Http, no_metadata())
    .await
    .unwrap();
  assert_eq!(manager.pool_metrics().unwrap().active_resources, 1);
  pool.release(resource).unwrap();
  assert_eq!(manager.pool_metrics().unwrap().idle_resources, 1);

  manager.close().unwrap();
  assert!(pool.is_closed());
}

#[test]
fn test_close_is_idempotent() {
  let (manager, _) = build_manager(engine_config());
  manager.close().unwrap();
  manager.close().unwrap();
}
