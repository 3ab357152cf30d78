//! Component probes. A probe answers one question about one component; timeouts and
//! conversion into [`HealthCheckResult`](crate::models::HealthCheckResult) belong to the
//! monitor.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use sysinfo::System;
use thiserror::Error;

use crate::models::Component;
use crate::store::{SharedStore, StoreError};

/// Metric keys shared between probes and recovery handlers
pub mod metric_keys {
    pub const STATUS_CODE: &str = "status_code";
    pub const WORKFLOW_ID: &str = "workflow_id";
    pub const FAILED_WORKFLOWS: &str = "failed_workflows";
    pub const CPU_USAGE_PERCENT: &str = "cpu_usage_percent";
    pub const MEMORY_USAGE_PERCENT: &str = "memory_usage_percent";
    pub const CPU_PRESSURE: &str = "cpu_pressure";
    pub const MEMORY_PRESSURE: &str = "memory_pressure";
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe timed out after {0}ms")]
    Timeout(u64),

    #[error("Store unreachable: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP probe failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned status {0}")]
    Status(u16),

    #[error("Unexpected probe response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub error: Option<String>,
    pub metrics: Option<BTreeMap<String, Value>>,
}

impl ProbeOutcome {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            error: Some(error.into()),
            metrics: None,
        }
    }

    pub fn with_metric(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metrics
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
pub trait HealthProbe: Send + Sync + std::fmt::Debug {
    fn component(&self) -> Component;

    async fn probe(&self) -> Result<ProbeOutcome, ProbeError>;
}

/// Round-trips the durable store
#[derive(Debug)]
pub struct DatabaseProbe {
    store: SharedStore,
}

impl DatabaseProbe {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthProbe for DatabaseProbe {
    fn component(&self) -> Component {
        Component::Database
    }

    async fn probe(&self) -> Result<ProbeOutcome, ProbeError> {
        self.store.ping().await?;
        Ok(ProbeOutcome::healthy())
    }
}

/// GETs the API health endpoint; any non-2xx status is unhealthy
#[derive(Debug)]
pub struct HttpApiProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpApiProbe {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpApiProbe {
    fn component(&self) -> Component {
        Component::Api
    }

    async fn probe(&self) -> Result<ProbeOutcome, ProbeError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }
        Ok(ProbeOutcome::healthy().with_metric(metric_keys::STATUS_CODE, status.as_u16()))
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowSummary {
    id: String,
    status: String,
}

/// Reads `{base}/workflows/status` and reports the first failed workflow
#[derive(Debug)]
pub struct WorkflowProbe {
    client: reqwest::Client,
    base_url: String,
}

impl WorkflowProbe {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for WorkflowProbe {
    fn component(&self) -> Component {
        Component::Workflow
    }

    async fn probe(&self) -> Result<ProbeOutcome, ProbeError> {
        let url = format!("{}/workflows/status", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let workflows: Vec<WorkflowSummary> = response
            .json()
            .await
            .map_err(|e| ProbeError::InvalidResponse(e.to_string()))?;
        let failed: Vec<&WorkflowSummary> = workflows
            .iter()
            .filter(|w| w.status.eq_ignore_ascii_case("failed"))
            .collect();

        match failed.first() {
            None => Ok(ProbeOutcome::healthy().with_metric(metric_keys::FAILED_WORKFLOWS, 0)),
            Some(first) => Ok(ProbeOutcome::unhealthy(format!(
                "workflow {} failed ({} failed in total)",
                first.id,
                failed.len()
            ))
            .with_metric(metric_keys::WORKFLOW_ID, first.id.clone())
            .with_metric(metric_keys::FAILED_WORKFLOWS, failed.len())),
        }
    }
}

/// Host CPU and memory pressure via `sysinfo`
#[derive(Debug)]
pub struct PerformanceProbe {
    system: Mutex<System>,
    cpu_threshold_percent: f64,
    memory_threshold_percent: f64,
}

impl PerformanceProbe {
    pub fn new(cpu_threshold_percent: f64, memory_threshold_percent: f64) -> Self {
        // CPU usage is measured against the previous refresh, so take a baseline now
        let mut system = System::new();
        system.refresh_cpu();
        Self {
            system: Mutex::new(system),
            cpu_threshold_percent,
            memory_threshold_percent,
        }
    }

    fn sample(&self) -> (f64, f64) {
        let mut system = self.system.lock();
        system.refresh_cpu();
        system.refresh_memory();
        let cpu = f64::from(system.global_cpu_info().cpu_usage());
        let memory = match system.total_memory() {
            0 => 0.0,
            total => system.used_memory() as f64 / total as f64 * 100.0,
        };
        (cpu, memory)
    }
}

#[async_trait]
impl HealthProbe for PerformanceProbe {
    fn component(&self) -> Component {
        Component::Performance
    }

    async fn probe(&self) -> Result<ProbeOutcome, ProbeError> {
        let (cpu, memory) = self.sample();
        Ok(assess_pressure(
            cpu,
            memory,
            self.cpu_threshold_percent,
            self.memory_threshold_percent,
        ))
    }
}

/// Turn a CPU / memory sample into an outcome with pressure flags
pub fn assess_pressure(
    cpu_percent: f64,
    memory_percent: f64,
    cpu_threshold_percent: f64,
    memory_threshold_percent: f64,
) -> ProbeOutcome {
    let cpu_pressure = cpu_percent > cpu_threshold_percent;
    let memory_pressure = memory_percent > memory_threshold_percent;

    let mut problems = Vec::new();
    if cpu_pressure {
        problems.push(format!("CPU usage {cpu_percent:.1}% above {cpu_threshold_percent}%"));
    }
    if memory_pressure {
        problems.push(format!(
            "memory usage {memory_percent:.1}% above {memory_threshold_percent}%"
        ));
    }

    let outcome = if problems.is_empty() {
        ProbeOutcome::healthy()
    } else {
        ProbeOutcome::unhealthy(problems.join("; "))
    };
    outcome
        .with_metric(metric_keys::CPU_USAGE_PERCENT, cpu_percent)
        .with_metric(metric_keys::MEMORY_USAGE_PERCENT, memory_percent)
        .with_metric(metric_keys::CPU_PRESSURE, cpu_pressure)
        .with_metric(metric_keys::MEMORY_PRESSURE, memory_pressure)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn test_assess_pressure_flags() {
        let calm = assess_pressure(20.0, 40.0, 90.0, 90.0);
        assert!(calm.healthy);
        assert_eq!(calm.metrics.as_ref().unwrap()[metric_keys::CPU_PRESSURE], false);

        let hot = assess_pressure(97.5, 40.0, 90.0, 90.0);
        assert!(!hot.healthy);
        assert!(hot.error.as_deref().unwrap().starts_with("CPU usage 97.5%"));
        assert_eq!(hot.metrics.as_ref().unwrap()[metric_keys::CPU_PRESSURE], true);
        assert_eq!(hot.metrics.as_ref().unwrap()[metric_keys::MEMORY_PRESSURE], false);
    }

    #[tokio::test]
    async fn test_database_probe_reports_store_outage() {
        let store = Arc::new(InMemoryStore::new());
        let probe = DatabaseProbe::new(store.clone());
        assert!(probe.probe().await.unwrap().healthy);

        store.set_available(false);
        assert!(matches!(probe.probe().await, Err(ProbeError::Store(_))));
    }

    #[tokio::test]
    async fn test_performance_probe_samples_host() {
        let probe = PerformanceProbe::new(101.0, 101.0);
        let outcome = probe.probe().await.unwrap();
        assert!(outcome.healthy);
        assert!(outcome.metrics.unwrap().contains_key(metric_keys::MEMORY_USAGE_PERCENT));
    }

    #[test]
    fn test_performance_probe_takes_cpu_baseline_on_creation() {
        let probe = PerformanceProbe::new(90.0, 90.0);
        assert!(!probe.system.lock().cpus().is_empty());
    }
}
