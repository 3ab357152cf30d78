use async_trait::async_trait;
use serde_json::json;

use super::{Alert, NotificationError, NotificationSink};
use crate::config::EmailSinkConfig;

fn check_status(sink: &str, response: &reqwest::Response) -> Result<(), NotificationError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(NotificationError::Rejected {
            sink: sink.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Email through an HTTP mail relay
#[derive(Debug, Clone)]
pub struct EmailSink {
    client: reqwest::Client,
    config: EmailSinkConfig,
}

impl EmailSink {
    pub fn new(client: reqwest::Client, config: EmailSinkConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl NotificationSink for EmailSink {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        if self.config.recipients.is_empty() {
            return Err(NotificationError::Misconfigured(
                "email sink has no recipients".to_string(),
            ));
        }
        let body = json!({
            "from": self.config.from,
            "to": self.config.recipients,
            "subject": format!("[{}] {} health alert", alert.severity.as_str().to_uppercase(), alert.component),
            "text": alert.summary(),
            "alert": alert,
        });
        let response = self
            .client
            .post(&self.config.relay_url)
            .json(&body)
            .send()
            .await?;
        check_status(self.name(), &response)
    }
}

/// Chat webhook (Slack-compatible `{"text": ...}` body)
#[derive(Debug, Clone)]
pub struct ChatWebhookSink {
    client: reqwest::Client,
    webhook_url: String,
}

impl ChatWebhookSink {
    pub fn new(client: reqwest::Client, webhook_url: String) -> Self {
        Self {
            client,
            webhook_url,
        }
    }
}

#[async_trait]
impl NotificationSink for ChatWebhookSink {
    fn name(&self) -> &str {
        "chat"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "text": alert.summary() }))
            .send()
            .await?;
        check_status(self.name(), &response)
    }
}

/// Generic webhook receiving the alert as JSON
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        let response = self.client.post(&self.url).json(alert).send().await?;
        check_status(self.name(), &response)
    }
}
