//! Portal registry and probes.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use tokio::time::Instant;

use crate::health::ProbeError;
use crate::models::{PortalPerformance, PortalStatus};

/// One observation of a portal
#[derive(Debug, Clone, PartialEq)]
pub struct PortalSample {
    pub response_time_ms: f64,
    pub success: bool,
    /// Error rate reported by the portal itself, percent
    pub reported_error_rate: Option<f64>,
    pub error: Option<String>,
}

impl PortalSample {
    pub fn ok(response_time_ms: f64) -> Self {
        Self {
            response_time_ms,
            success: true,
            reported_error_rate: None,
            error: None,
        }
    }

    pub fn failed(response_time_ms: f64, error: impl Into<String>) -> Self {
        Self {
            response_time_ms,
            success: false,
            reported_error_rate: None,
            error: Some(error.into()),
        }
    }

    pub fn with_error_rate(mut self, error_rate: f64) -> Self {
        self.reported_error_rate = Some(error_rate);
        self
    }
}

#[async_trait]
pub trait PortalProbe: Send + Sync + std::fmt::Debug {
    async fn sample(&self, portal: &str) -> Result<PortalSample, ProbeError>;
}

#[derive(Debug, Default, Deserialize)]
struct PortalHealthBody {
    error_rate: Option<f64>,
}

/// GETs `{base}/{portal}/health`; the body may carry an `error_rate` percentage
#[derive(Debug)]
pub struct HttpPortalProbe {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPortalProbe {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PortalProbe for HttpPortalProbe {
    async fn sample(&self, portal: &str) -> Result<PortalSample, ProbeError> {
        let url = format!("{}/{}/health", self.base_url.trim_end_matches('/'), portal);
        let started = Instant::now();
        let response = self.client.get(&url).send().await?;
        let elapsed = started.elapsed().as_secs_f64() * 1000.0;

        let status = response.status();
        if !status.is_success() {
            return Ok(PortalSample::failed(elapsed, format!("status {}", status.as_u16())));
        }
        let body: PortalHealthBody = response.json().await.unwrap_or_default();
        let sample = PortalSample::ok(elapsed);
        Ok(match body.error_rate {
            Some(rate) => sample.with_error_rate(rate),
            None => sample,
        })
    }
}

#[derive(Debug)]
struct PortalEntry {
    status: PortalStatus,
    availability: VecDeque<bool>,
}

/// Portals by name, written only by the portal loop
#[derive(Debug)]
pub struct PortalRegistry {
    portals: DashMap<String, PortalEntry>,
    window: usize,
}

impl PortalRegistry {
    pub fn new<I, S>(names: I, window: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let portals = DashMap::new();
        for name in names {
            let name = name.into();
            portals.insert(
                name.clone(),
                PortalEntry {
                    status: PortalStatus::new(name),
                    availability: VecDeque::new(),
                },
            );
        }
        Self {
            portals,
            window: window.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.portals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.portals.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<PortalStatus> {
        self.portals.get(name).map(|entry| entry.status.clone())
    }

    /// Enabled portal names, sorted
    pub fn enabled_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .portals
            .iter()
            .filter(|entry| entry.status.enabled)
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn snapshot(&self) -> Vec<PortalStatus> {
        let mut statuses: Vec<PortalStatus> =
            self.portals.iter().map(|entry| entry.status.clone()).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.portals.get_mut(name) {
            Some(mut entry) => {
                entry.status.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Fold a sample into the portal's rolling window. Unknown portals are ignored.
    pub fn record(&self, name: &str, sample: &PortalSample, now: DateTime<Utc>) -> Option<PortalStatus> {
        let mut entry = self.portals.get_mut(name)?;
        entry.availability.push_back(sample.success);
        while entry.availability.len() > self.window {
            entry.availability.pop_front();
        }

        let successes = entry.availability.iter().filter(|ok| **ok).count();
        let uptime = successes as f64 / entry.availability.len() as f64 * 100.0;
        let error_rate = sample.reported_error_rate.unwrap_or(100.0 - uptime);

        entry.status.performance = PortalPerformance {
            response_time_ms: sample.response_time_ms,
            error_rate,
            uptime,
        };
        entry.status.last_activity = Some(now);
        entry.status.last_error = sample.error.clone();
        entry.status.samples += 1;
        Some(entry.status.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_uptime_and_error_rate() {
        let registry = PortalRegistry::new(["broker", "carrier"], 4);
        let now = Utc::now();

        registry.record("broker", &PortalSample::ok(120.0), now);
        registry.record("broker", &PortalSample::failed(900.0, "status 503"), now);
        let status = registry.record("broker", &PortalSample::ok(110.0), now).unwrap();
        assert!((status.performance.uptime - 200.0 / 3.0).abs() < 1e-9);
        assert!((status.performance.error_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(status.samples, 3);
        assert!(status.last_error.is_none());

        let status = registry
            .record("broker", &PortalSample::ok(100.0).with_error_rate(1.5), now)
            .unwrap();
        assert_eq!(status.performance.error_rate, 1.5);
        assert!(registry.record("unknown", &PortalSample::ok(1.0), now).is_none());
    }

    #[test]
    fn test_window_is_bounded() {
        let registry = PortalRegistry::new(["shipper"], 2);
        let now = Utc::now();
        registry.record("shipper", &PortalSample::failed(10.0, "down"), now);
        registry.record("shipper", &PortalSample::ok(10.0), now);
        let status = registry.record("shipper", &PortalSample::ok(10.0), now).unwrap();
        assert_eq!(status.performance.uptime, 100.0);
    }

    #[test]
    fn test_disabled_portals_are_skipped() {
        let registry = PortalRegistry::new(["b", "a", "c"], 10);
        assert!(registry.set_enabled("b", false));
        assert!(!registry.set_enabled("zz", false));
        assert_eq!(registry.enabled_names(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(registry.snapshot()[0].name, "a");
    }
}
