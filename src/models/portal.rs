use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest performance snapshot of a portal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortalPerformance {
    pub response_time_ms: f64,
    /// Percent of failed requests, 0..=100
    pub error_rate: f64,
    /// Percent availability over the rolling sample window, 0..=100
    pub uptime: f64,
}

impl Default for PortalPerformance {
    fn default() -> Self {
        Self {
            response_time_ms: 0.0,
            error_rate: 0.0,
            uptime: 100.0,
        }
    }
}

/// A user-facing portal watched by the SLO guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalStatus {
    pub name: String,
    pub enabled: bool,
    pub autonomous: bool,
    pub last_activity: Option<DateTime<Utc>>,
    pub performance: PortalPerformance,
    pub last_error: Option<String>,
    /// Samples taken so far; zero means the portal is not yet part of SLO aggregation
    #[serde(default)]
    pub samples: u64,
}

impl PortalStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            autonomous: true,
            last_activity: None,
            performance: PortalPerformance::default(),
            last_error: None,
            samples: 0,
        }
    }
}
