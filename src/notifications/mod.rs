//! # Notifications
//!
//! Fire-and-forget alert fan-out. Every sink receives the same [`Alert`]; delivery runs
//! on spawned tasks so a slow or failing sink never holds up a health run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::NotificationConfig;
use crate::models::{HealthCheckResult, Severity};

pub mod sinks;

pub use sinks::{ChatWebhookSink, EmailSink, WebhookSink};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sink {sink} rejected alert with status {status}")]
    Rejected { sink: String, status: u16 },

    #[error("Sink misconfigured: {0}")]
    Misconfigured(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub component: String,
    pub error: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: u64,
}

impl Alert {
    pub fn from_result(result: &HealthCheckResult) -> Self {
        Self {
            component: result.component.to_string(),
            error: result
                .error
                .clone()
                .unwrap_or_else(|| "unhealthy".to_string()),
            severity: result.severity(),
            timestamp: result.timestamp,
            response_time_ms: result.response_time_ms,
        }
    }

    /// One-line human-readable summary used by text-oriented sinks
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} unhealthy after {}ms: {}",
            self.severity.as_str().to_uppercase(),
            self.component,
            self.response_time_ms,
            self.error
        )
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError>;
}

/// Fans an alert out to every configured sink
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    /// Build the HTTP sinks named in configuration
    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()?;

        let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::new();
        if let Some(email) = &config.email {
            sinks.push(Arc::new(EmailSink::new(client.clone(), email.clone())));
        }
        if let Some(url) = &config.chat_webhook_url {
            sinks.push(Arc::new(ChatWebhookSink::new(client.clone(), url.clone())));
        }
        if let Some(url) = &config.webhook_url {
            sinks.push(Arc::new(WebhookSink::new(client, url.clone())));
        }
        Ok(Self { sinks })
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Spawn one delivery per sink. Handles are returned for callers that want to wait;
    /// the monitor itself drops them.
    pub fn dispatch(&self, alert: Alert) -> Vec<JoinHandle<()>> {
        let alert = Arc::new(alert);
        self.sinks
            .iter()
            .map(|sink| {
                let sink = Arc::clone(sink);
                let alert = Arc::clone(&alert);
                tokio::spawn(async move {
                    match sink.notify(&alert).await {
                        Ok(()) => debug!(sink = %sink.name(), component = %alert.component, "Alert delivered"),
                        Err(e) => warn!(sink = %sink.name(), component = %alert.component, error = %e, "Alert delivery failed"),
                    }
                })
            })
            .collect()
    }
}
