mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use tms_autonomy::config::HealthConfig;
use tms_autonomy::health::{DatabaseProbe, DatabaseRecovery};
use tms_autonomy::models::{Component, IssueStatus, Severity};
use tms_autonomy::notifications::{NotificationSink, Notifier};
use tms_autonomy::{HealthMonitor, InMemoryStore};

fn monitor(config: HealthConfig) -> (HealthMonitor, Arc<InMemoryStore>, Arc<RecordingSink>) {
    let (store, shared) = memory_store();
    let sink = Arc::new(RecordingSink::default());
    let notifier = Notifier::new(vec![sink.clone() as Arc<dyn NotificationSink>]);
    (HealthMonitor::new(config, shared, notifier), store, sink)
}

fn generous_timeout() -> HealthConfig {
    HealthConfig {
        probe_timeout_ms: 15_000,
        ..HealthConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_failure_is_high_severity() {
    let (monitor, store, sink) = monitor(generous_timeout());
    let monitor = monitor.with_probe(Arc::new(StubProbe::slow(
        "billing",
        Duration::from_millis(6_000),
        false,
    )));

    let results = monitor.run_checks().await;
    settle().await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].healthy);
    assert!(results[0].response_time_ms >= 6_000);
    assert_eq!(results[0].severity(), Severity::High);

    let alerts = sink.alerts.lock().clone();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::High);
    assert_eq!(alerts[0].component, "billing");

    // No handler registered for the component
    let issues = store.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].status, IssueStatus::ManualReview);
    assert_eq!(issues[0].severity, Severity::High);
    assert!(store.escalations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_very_slow_failure_is_critical() {
    let (monitor, _, sink) = monitor(generous_timeout());
    let monitor = monitor.with_probe(Arc::new(StubProbe::slow(
        "billing",
        Duration::from_millis(11_000),
        false,
    )));

    let results = monitor.run_checks().await;
    settle().await;

    assert_eq!(results[0].severity(), Severity::Critical);
    assert_eq!(sink.alerts.lock()[0].severity, Severity::Critical);
}

#[tokio::test(start_paused = true)]
async fn test_hung_probe_times_out() {
    let config = HealthConfig {
        probe_timeout_ms: 1_000,
        ..HealthConfig::default()
    };
    let (monitor, store, _) = monitor(config);
    let monitor = monitor
        .with_probe(Arc::new(StubProbe::slow("edi", Duration::from_secs(60), true)))
        .with_probe(Arc::new(StubProbe::healthy("rates")));

    let results = monitor.run_checks().await;

    let edi = results
        .iter()
        .find(|r| r.component == Component::from("edi"))
        .unwrap();
    assert!(!edi.healthy);
    assert!(edi.error.as_deref().unwrap().contains("timed out"));
    assert!(edi.response_time_ms < 2_000);

    let rates = results
        .iter()
        .find(|r| r.component == Component::from("rates"))
        .unwrap();
    assert!(rates.healthy);
    assert_eq!(store.health_checks().len(), 2);
}

#[tokio::test]
async fn test_failed_recovery_escalates() {
    let (monitor, store, _) = monitor(HealthConfig::default());
    let recovery = Arc::new(CountingRecovery::failing("supervisor unreachable"));
    let monitor = monitor
        .with_probe(Arc::new(StubProbe::unhealthy(Component::Api)))
        .with_recovery(Component::Api, recovery.clone());

    monitor.run_checks().await;

    assert_eq!(recovery.calls(), 1);
    let escalations = store.escalations();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].component, Component::Api);
    assert!(escalations[0]
        .recovery_error
        .as_deref()
        .unwrap()
        .contains("supervisor unreachable"));
    assert_eq!(store.issues()[0].status, IssueStatus::Escalated);
}

#[tokio::test]
async fn test_repeated_failures_escalate_despite_recovery() {
    let config = HealthConfig {
        escalation_threshold: 2,
        ..HealthConfig::default()
    };
    let (monitor, store, _) = monitor(config);
    let recovery = Arc::new(CountingRecovery::succeeding());
    let monitor = monitor
        .with_probe(Arc::new(StubProbe::unhealthy(Component::Workflow)))
        .with_recovery(Component::Workflow, recovery.clone());

    monitor.run_checks().await;
    assert_eq!(monitor.consecutive_failures(&Component::Workflow), 1);
    assert_eq!(store.issues()[0].status, IssueStatus::Recovered);
    assert!(store.escalations().is_empty());

    monitor.run_checks().await;
    assert_eq!(monitor.consecutive_failures(&Component::Workflow), 2);
    assert_eq!(store.issues()[1].status, IssueStatus::Escalated);
    assert_eq!(store.escalations().len(), 1);
    assert!(store.escalations()[0].recovery_error.is_none());
    assert_eq!(recovery.calls(), 2);
}

#[tokio::test]
async fn test_database_outage_reconnects_then_escalates() {
    let (store, shared) = memory_store();
    let monitor = HealthMonitor::new(HealthConfig::default(), shared.clone(), Notifier::default())
        .with_probe(Arc::new(DatabaseProbe::new(shared.clone())))
        .with_recovery(Component::Database, Arc::new(DatabaseRecovery::new(shared)));

    store.set_available(false);
    let results = monitor.run_checks().await;
    assert!(!results[0].healthy);
    assert_eq!(store.reconnects(), 1);

    store.set_available(true);
    let results = monitor.run_checks().await;
    assert!(results[0].healthy);
    assert_eq!(monitor.consecutive_failures(&Component::Database), 0);
}

#[tokio::test]
async fn test_metrics_aggregate_over_window() {
    let (monitor, store, _) = monitor(HealthConfig::default());
    let monitor = monitor
        .with_probe(Arc::new(StubProbe::healthy(Component::Api)))
        .with_probe(Arc::new(StubProbe::unhealthy("portal-gateway")));

    monitor.run_checks().await;

    let metrics = monitor.last_metrics().unwrap();
    assert!((metrics.uptime_percent - 50.0).abs() < 1e-9);
    assert!((metrics.error_rate_percent - 50.0).abs() < 1e-9);
    assert_eq!(store.system_metrics().len(), 1);
}
