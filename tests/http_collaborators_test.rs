//! HTTP probes, restart hooks, portal probing and notification sinks against a mock server

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tms_autonomy::config::{EmailSinkConfig, NotificationConfig};
use tms_autonomy::health::{
    metric_keys, ApiRestartRecovery, HealthProbe, HttpApiProbe, ProbeError, RecoveryError,
    RecoveryHandler, WorkflowProbe, WorkflowRestartRecovery,
};
use tms_autonomy::models::{Component, HealthCheckResult, Severity};
use tms_autonomy::notifications::{
    Alert, ChatWebhookSink, EmailSink, NotificationError, NotificationSink, Notifier, WebhookSink,
};
use tms_autonomy::slo::{HttpPortalProbe, PortalProbe};

fn unhealthy(component: Component, outcome_metrics: Option<serde_json::Value>) -> HealthCheckResult {
    HealthCheckResult {
        component,
        healthy: false,
        response_time_ms: 6_500,
        error: Some("down".to_string()),
        timestamp: Utc::now(),
        metrics: outcome_metrics.and_then(|m| serde_json::from_value(m).ok()),
    }
}

#[tokio::test]
async fn test_api_probe_reads_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let ok = HttpApiProbe::new(client.clone(), format!("{}/health", server.uri()))
        .probe()
        .await
        .unwrap();
    assert!(ok.healthy);
    assert_eq!(ok.metrics.unwrap()[metric_keys::STATUS_CODE], 200);

    let err = HttpApiProbe::new(client, format!("{}/broken", server.uri()))
        .probe()
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Status(503)));
}

#[tokio::test]
async fn test_failed_workflow_is_reported_and_restarted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workflows/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "wf-1", "status": "running" },
            { "id": "wf-2", "status": "failed" },
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/workflows/wf-2/restart"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let outcome = WorkflowProbe::new(client.clone(), server.uri())
        .probe()
        .await
        .unwrap();
    assert!(!outcome.healthy);
    let metrics = outcome.metrics.unwrap();
    assert_eq!(metrics[metric_keys::WORKFLOW_ID], "wf-2");
    assert_eq!(metrics[metric_keys::FAILED_WORKFLOWS], 1);

    let result = unhealthy(
        Component::Workflow,
        Some(json!({ "workflow_id": "wf-2" })),
    );
    WorkflowRestartRecovery::new(client, server.uri())
        .recover(&result)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_workflow_restart_needs_an_id() {
    let recovery = WorkflowRestartRecovery::new(reqwest::Client::new(), "http://127.0.0.1:9");
    let err = recovery
        .recover(&unhealthy(Component::Workflow, None))
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::MissingWorkflowId));
}

#[tokio::test]
async fn test_api_restart_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/restart"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = ApiRestartRecovery::new(reqwest::Client::new(), format!("{}/restart", server.uri()))
        .recover(&unhealthy(Component::Api, None))
        .await
        .unwrap_err();
    assert!(matches!(err, RecoveryError::Status(500)));
}

#[tokio::test]
async fn test_portal_probe_samples() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broker/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error_rate": 1.5 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/carrier/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let probe = HttpPortalProbe::new(reqwest::Client::new(), server.uri());

    let broker = probe.sample("broker").await.unwrap();
    assert!(broker.success);
    assert_eq!(broker.reported_error_rate, Some(1.5));

    let carrier = probe.sample("carrier").await.unwrap();
    assert!(!carrier.success);
    assert_eq!(carrier.error.as_deref(), Some("status 503"));
}

#[tokio::test]
async fn test_webhook_sinks_deliver_alert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/alerts"))
        .and(body_partial_json(json!({ "component": "api", "severity": "high" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hooks/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let alert = Alert::from_result(&unhealthy(Component::Api, None));
    assert_eq!(alert.severity, Severity::High);

    let client = reqwest::Client::new();
    WebhookSink::new(client.clone(), format!("{}/hooks/alerts", server.uri()))
        .notify(&alert)
        .await
        .unwrap();

    let err = ChatWebhookSink::new(client, format!("{}/hooks/chat", server.uri()))
        .notify(&alert)
        .await
        .unwrap_err();
    assert!(matches!(err, NotificationError::Rejected { status: 500, .. }));
}

#[tokio::test]
async fn test_email_sink_requires_recipients() {
    let sink = EmailSink::new(
        reqwest::Client::new(),
        EmailSinkConfig {
            relay_url: "http://127.0.0.1:9/send".to_string(),
            from: "ops@tms.example".to_string(),
            recipients: Vec::new(),
        },
    );
    let alert = Alert::from_result(&unhealthy(Component::Database, None));
    assert!(matches!(
        sink.notify(&alert).await,
        Err(NotificationError::Misconfigured(_))
    ));
}

#[tokio::test]
async fn test_notifier_fans_out_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let notifier = Notifier::from_config(&NotificationConfig {
        chat_webhook_url: Some(format!("{}/chat", server.uri())),
        webhook_url: Some(format!("{}/webhook", server.uri())),
        ..NotificationConfig::default()
    })
    .unwrap();
    assert_eq!(notifier.sink_count(), 2);

    let handles = notifier.dispatch(Alert::from_result(&unhealthy(Component::Api, None)));
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
