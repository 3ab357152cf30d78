//! Append-only audit records written to the durable store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::health::{Component, HealthCheckResult, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Recovered,
    Escalated,
    ManualReview,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Recovered => "recovered",
            Self::Escalated => "escalated",
            Self::ManualReview => "manual_review",
        }
    }
}

/// One unhealthy observation and what happened to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub component: Component,
    pub severity: Severity,
    pub error: Option<String>,
    pub response_time_ms: u64,
    pub status: IssueStatus,
    pub timestamp: DateTime<Utc>,
}

impl Issue {
    pub fn from_result(result: &HealthCheckResult, status: IssueStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            component: result.component.clone(),
            severity: result.severity(),
            error: result.error.clone(),
            response_time_ms: result.response_time_ms,
            status,
            timestamp: result.timestamp,
        }
    }
}

/// Human page. Only produced by failed or repeatedly ineffective recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    pub id: Uuid,
    pub component: Component,
    pub severity: Severity,
    pub original_error: Option<String>,
    pub recovery_error: Option<String>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub uptime_percent: f64,
    pub avg_response_time_ms: f64,
    pub error_rate_percent: f64,
    pub cpu_usage_percent: Option<f64>,
    pub memory_usage_percent: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub event_type: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl SystemEvent {
    pub fn new(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
