//! Health check results and the severity scale shared by health, SLO and alerting.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::severity_bands;

/// Probed component. Anything outside the known set is carried by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Component {
    Database,
    Api,
    Workflow,
    Performance,
    Other(String),
}

impl Component {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Database => "database",
            Self::Api => "api",
            Self::Workflow => "workflow",
            Self::Performance => "performance",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Component {
    fn from(value: String) -> Self {
        match value.as_str() {
            "database" => Self::Database,
            "api" => Self::Api,
            "workflow" => Self::Workflow,
            "performance" => Self::Performance,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Component> for String {
    fn from(value: Component) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity scale. Ordering is `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Classify purely by response time; health status plays no part
    pub fn from_response_time(response_time_ms: u64) -> Self {
        if response_time_ms > severity_bands::CRITICAL_ABOVE_MS {
            Self::Critical
        } else if response_time_ms > severity_bands::HIGH_ABOVE_MS {
            Self::High
        } else if response_time_ms > severity_bands::MEDIUM_ABOVE_MS {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub component: Component,
    pub healthy: bool,
    pub response_time_ms: u64,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metrics: Option<BTreeMap<String, Value>>,
}

impl HealthCheckResult {
    pub fn severity(&self) -> Severity {
        Severity::from_response_time(self.response_time_ms)
    }

    /// Look up a string metric reported by the probe
    pub fn metric_str(&self, key: &str) -> Option<&str> {
        self.metrics.as_ref()?.get(key)?.as_str()
    }

    /// Look up a numeric metric reported by the probe
    pub fn metric_f64(&self, key: &str) -> Option<f64> {
        self.metrics.as_ref()?.get(key)?.as_f64()
    }
}
