mod common;

use ballast::cache::ErrorKind;
use ballast::monitor::{system, MonitorConfig};
use ballast::{
  AlertSeverity, FixedProbe, MonitorError, PerformanceMetric, PerformanceMonitor,
  PerformanceThreshold, ReclaimStats,
};
use common::{quiet_monitor_config, RecordingSink};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

const LATENCY: &str = "checkout_latency";

fn latency_threshold() -> PerformanceThreshold {
  PerformanceThreshold::new(LATENCY, 100.0, 200.0, "ms")
}

fn build_monitor(config: MonitorConfig) -> (PerformanceMonitor, Arc<RecordingSink>) {
  let sink = Arc::new(RecordingSink::default());
  let monitor = PerformanceMonitor::with_parts(
    config,
    Arc::new(FixedProbe::new(4096)),
    Arc::new(ReclaimStats::new()),
    sink.clone(),
  )
  .unwrap();
  (monitor, sink)
}

fn with_latency_threshold() -> MonitorConfig {
  MonitorConfig {
    thresholds: vec![latency_threshold()],
    ..quiet_monitor_config()
  }
}

fn latency(value: f64) -> PerformanceMetric {
  PerformanceMetric::new(LATENCY, value, "ms")
}

#[test]
fn test_values_are_banded_by_threshold() {
  let (monitor, _) = build_monitor(with_latency_threshold());

  assert!(monitor.record_metric(latency(50.0)).is_none());

  let warning = monitor.record_metric(latency(100.0)).unwrap();
  assert_eq!(warning.severity, AlertSeverity::Warning);
  assert_eq!(warning.threshold, 100.0);
  assert_eq!(warning.value, 100.0);
  assert!(!warning.resolved);

  let critical = monitor.record_metric(latency(250.0)).unwrap();
  assert_eq!(critical.severity, AlertSeverity::Critical);
  assert_eq!(critical.threshold, 200.0);
  assert_eq!(
    critical.message,
    "checkout_latency is 250ms, at or above the critical threshold of 200ms"
  );

  assert_eq!(monitor.get_alerts(false).len(), 2);
  assert!(monitor.get_alerts(true).is_empty());
  assert_eq!(monitor.get_metrics(LATENCY, 0).len(), 3, "every sample is stored");
}

#[test]
fn test_repeated_crossings_are_deduplicated_until_resolved() {
  let (monitor, _) = build_monitor(with_latency_threshold());

  let first = monitor.record_metric(latency(150.0)).unwrap();
  assert!(monitor.record_metric(latency(160.0)).is_none());
  assert_eq!(monitor.get_alerts(false).len(), 1);

  monitor.resolve_alert(first.id).unwrap();
  let second = monitor.record_metric(latency(170.0)).unwrap();
  assert_ne!(second.id, first.id);
  assert_eq!(monitor.get_alerts(false).len(), 1);
  assert_eq!(monitor.get_alerts(true).len(), 1);
}

#[test]
fn test_every_crossing_alerts_without_deduplication() {
  let (monitor, _) = build_monitor(MonitorConfig {
    dedupe_alerts: false,
    ..with_latency_threshold()
  });

  for value in [150.0, 160.0, 170.0] {
    assert!(monitor.record_metric(latency(value)).is_some());
  }
  assert_eq!(monitor.get_alerts(false).len(), 3);
}

#[test]
fn test_resolve_is_idempotent_and_reports_unknown_ids() {
  let (monitor, _) = build_monitor(with_latency_threshold());
  let alert = monitor.record_metric(latency(300.0)).unwrap();

  let resolved = monitor.resolve_alert(alert.id).unwrap();
  assert!(resolved.resolved);
  let resolved_at = resolved.resolved_at.unwrap();

  let again = monitor.resolve_alert(alert.id).unwrap();
  assert_eq!(again.resolved_at, Some(resolved_at));

  let missing = Uuid::new_v4();
  match monitor.resolve_alert(missing) {
    Err(err @ MonitorError::AlertNotFound(_)) => assert_eq!(err.kind(), ErrorKind::NotFound),
    other => panic!("unexpected: {:?}", other),
  }
}

#[test]
fn test_alerting_can_be_disabled() {
  let (monitor, sink) = build_monitor(MonitorConfig {
    enable_alerting: false,
    ..with_latency_threshold()
  });
  assert!(monitor.record_metric(latency(500.0)).is_none());
  assert!(monitor.get_alerts(false).is_empty());
  assert_eq!(monitor.get_metrics(LATENCY, 0).len(), 1);
  monitor.close().unwrap();
  assert!(sink.alerts().is_empty());
}

#[test]
fn test_sink_receives_every_alert_by_close() {
  let (monitor, sink) = build_monitor(with_latency_threshold());
  monitor.record_metric(latency(150.0));
  monitor.record_metric(latency(250.0));
  monitor.close().unwrap();

  let delivered = sink.alerts();
  assert_eq!(delivered.len(), 2);
  assert_eq!(delivered[0].severity, AlertSeverity::Warning);
  assert_eq!(delivered[1].severity, AlertSeverity::Critical);
  assert_eq!(monitor.delivered_alerts(), 2);
  assert_eq!(monitor.dropped_alerts(), 0);

  monitor.close().unwrap();
}

#[test]
fn test_thresholds_can_be_added_and_removed() {
  let (monitor, _) = build_monitor(quiet_monitor_config());
  assert!(monitor.record_metric(latency(999.0)).is_none());

  monitor.add_threshold(latency_threshold()).unwrap();
  assert!(monitor.record_metric(latency(999.0)).is_some());
  assert_eq!(monitor.thresholds(), vec![latency_threshold()]);

  assert_eq!(monitor.remove_threshold(LATENCY), Some(latency_threshold()));
  assert!(monitor.remove_threshold(LATENCY).is_none());

  let err = monitor
    .add_threshold(PerformanceThreshold::new(LATENCY, 300.0, 200.0, "ms"))
    .unwrap_err();
  assert!(matches!(err, MonitorError::InvalidThreshold { .. }));
  assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_history_is_capped_and_sliced_from_the_newest() {
  let (monitor, _) = build_monitor(MonitorConfig {
    max_metrics: 4,
    ..quiet_monitor_config()
  });
  for i in 0..6 {
    monitor.record_metric(PerformanceMetric::new("queue_depth", i as f64, "items"));
  }

  let all: Vec<f64> = monitor
    .get_metrics("queue_depth", 0)
    .iter()
    .map(|m| m.value)
    .collect();
  assert_eq!(all, vec![2.0, 3.0, 4.0, 5.0]);

  let newest: Vec<f64> = monitor
    .get_metrics("queue_depth", 2)
    .iter()
    .map(|m| m.value)
    .collect();
  assert_eq!(newest, vec![4.0, 5.0]);

  assert!(monitor.get_metrics("unknown", 0).is_empty());
}

#[test]
fn test_samples_outside_retention_are_dropped() {
  let (monitor, _) = build_monitor(MonitorConfig {
    retention_period: Duration::from_secs(60),
    ..quiet_monitor_config()
  });

  let stale = Utc::now() - chrono::TimeDelta::minutes(5);
  monitor.record_metric(PerformanceMetric::new("stale", 1.0, "").at(stale));
  monitor.record_metric(PerformanceMetric::new("fresh", 1.0, ""));

  monitor.prune_expired();
  assert_eq!(monitor.metric_names(), vec!["fresh".to_string()]);
}

#[test]
fn test_system_sample_is_recorded_as_series() {
  let (monitor, _) = build_monitor(quiet_monitor_config());

  let snapshot = monitor.get_system_metrics();
  assert_eq!(snapshot.memory_bytes, 4096);
  assert!(monitor.metric_names().is_empty(), "reading a snapshot records nothing");

  monitor.sample_system();
  let names = monitor.metric_names();
  for name in [
    system::CPU_PERCENT,
    system::MEMORY_BYTES,
    system::CONCURRENCY,
    system::HEAP_BYTES,
  ] {
    assert!(names.contains(&name.to_string()), "missing {}", name);
  }
  assert_eq!(monitor.get_metrics(system::MEMORY_BYTES, 1)[0].value, 4096.0);
}

#[test]
fn test_background_sampler_records_on_its_interval() {
  let (monitor, _) = build_monitor(MonitorConfig {
    sampling_interval: Duration::from_millis(20),
    ..quiet_monitor_config()
  });
  std::thread::sleep(Duration::from_millis(150));
  monitor.close().unwrap();
  assert!(!monitor.get_metrics(system::MEMORY_BYTES, 0).is_empty());
}

#[tokio::test]
async fn test_concurrency_reports_live_runtime_tasks() {
  let (monitor, _) = build_monitor(quiet_monitor_config());
  let (tx, rx) = tokio::sync::oneshot::channel::<()>();
  let parked = tokio::spawn(async move {
    let _ = rx.await;
  });
  tokio::task::yield_now().await;

  assert!(monitor.get_system_metrics().concurrency >= 1);
  let _ = tx.send(());
  parked.await.unwrap();
}
