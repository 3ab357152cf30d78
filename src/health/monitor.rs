//! Health monitor: runs every probe under its own timeout, then recovers or escalates
//! unhealthy components and keeps rolling system metrics.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::probes::{metric_keys, HealthProbe, ProbeError};
use super::recovery::{RecoveryHandler, RecoveryRegistry};
use crate::config::HealthConfig;
use crate::logging::log_health_operation;
use crate::models::{
    Component, Escalation, HealthCheckResult, Issue, IssueStatus, SystemMetrics,
};
use crate::notifications::{Alert, Notifier};
use crate::store::SharedStore;

#[derive(Debug, Default)]
struct MonitorState {
    consecutive_failures: HashMap<Component, u32>,
    window: VecDeque<HealthCheckResult>,
    last_metrics: Option<SystemMetrics>,
}

/// Runs every registered probe, recovers what it can and escalates the rest
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthConfig,
    store: SharedStore,
    notifier: Notifier,
    probes: Vec<Arc<dyn HealthProbe>>,
    recovery: RecoveryRegistry,
    state: Mutex<MonitorState>,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig, store: SharedStore, notifier: Notifier) -> Self {
        Self {
            config,
            store,
            notifier,
            probes: Vec::new(),
            recovery: RecoveryRegistry::new(),
            state: Mutex::new(MonitorState::default()),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_recovery(mut self, component: Component, handler: Arc<dyn RecoveryHandler>) -> Self {
        self.recovery.register(component, handler);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    pub fn consecutive_failures(&self, component: &Component) -> u32 {
        self.state
            .lock()
            .consecutive_failures
            .get(component)
            .copied()
            .unwrap_or(0)
    }

    pub fn last_metrics(&self) -> Option<SystemMetrics> {
        self.state.lock().last_metrics.clone()
    }

    /// One monitoring pass. Probe failures never escape; they come back as unhealthy results.
    #[instrument(skip(self), fields(probes = self.probes.len()))]
    pub async fn run_checks(&self) -> Vec<HealthCheckResult> {
        let results = join_all(self.probes.iter().map(|probe| self.run_probe(probe.as_ref()))).await;

        let streaks: Vec<u32> = {
            let mut state = self.state.lock();
            results
                .iter()
                .map(|result| {
                    if result.healthy {
                        state.consecutive_failures.remove(&result.component);
                        0
                    } else {
                        let streak = state
                            .consecutive_failures
                            .entry(result.component.clone())
                            .or_insert(0);
                        *streak += 1;
                        *streak
                    }
                })
                .collect()
        };

        for (result, streak) in results.iter().zip(streaks) {
            if !result.healthy {
                self.handle_unhealthy(result, streak).await;
            }
        }

        if let Err(e) = self.store.insert_health_checks(&results).await {
            warn!(error = %e, "Failed to persist health check results");
        }

        let metrics = self.update_metrics(&results);
        if let Err(e) = self.store.insert_system_metrics(&metrics).await {
            warn!(error = %e, "Failed to persist system metrics");
        }

        let unhealthy = results.iter().filter(|r| !r.healthy).count();
        info!(
            checked = results.len(),
            unhealthy = unhealthy,
            uptime_percent = metrics.uptime_percent,
            "Health checks completed"
        );
        results
    }

    async fn run_probe(&self, probe: &dyn HealthProbe) -> HealthCheckResult {
        let component = probe.component();
        let limit = self.config.probe_timeout();
        let started = Instant::now();

        let outcome = timeout(limit, probe.probe()).await;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let (healthy, error, metrics) = match outcome {
            Ok(Ok(outcome)) => (outcome.healthy, outcome.error, outcome.metrics),
            Ok(Err(e)) => (false, Some(e.to_string()), None),
            Err(_) => (
                false,
                Some(ProbeError::Timeout(self.config.probe_timeout_ms).to_string()),
                None,
            ),
        };

        debug!(
            component = %component,
            healthy = healthy,
            response_time_ms = response_time_ms,
            "Probe finished"
        );

        HealthCheckResult {
            component,
            healthy,
            response_time_ms,
            error,
            timestamp: Utc::now(),
            metrics,
        }
    }

    async fn handle_unhealthy(&self, result: &HealthCheckResult, streak: u32) {
        let severity = result.severity();
        warn!(
            component = %result.component,
            severity = %severity,
            response_time_ms = result.response_time_ms,
            error = ?result.error,
            consecutive_failures = streak,
            "Component unhealthy"
        );
        log_health_operation(
            "probe",
            result.component.as_str(),
            "unhealthy",
            Some(result.response_time_ms),
            result.error.as_deref(),
        );

        // Delivery is fire-and-forget
        let _ = self.notifier.dispatch(Alert::from_result(result));

        let status = match self.recovery.get(&result.component) {
            None => {
                info!(component = %result.component, "No recovery handler, flagging for manual review");
                IssueStatus::ManualReview
            }
            Some(handler) => match handler.recover(result).await {
                Ok(()) if streak >= self.config.escalation_threshold => {
                    self.escalate(
                        result,
                        None,
                        format!("unhealthy for {streak} consecutive checks despite recovery"),
                    )
                    .await;
                    IssueStatus::Escalated
                }
                Ok(()) => {
                    log_health_operation("recovery", result.component.as_str(), "recovered", None, None);
                    IssueStatus::Recovered
                }
                Err(e) => {
                    let recovery_error = e.to_string();
                    log_health_operation(
                        "recovery",
                        result.component.as_str(),
                        "failed",
                        None,
                        Some(&recovery_error),
                    );
                    self.escalate(result, Some(recovery_error), "automated recovery failed".to_string())
                        .await;
                    IssueStatus::Escalated
                }
            },
        };

        if let Err(e) = self.store.insert_issue(&Issue::from_result(result, status)).await {
            warn!(component = %result.component, error = %e, "Failed to record issue");
        }
    }

    async fn escalate(&self, result: &HealthCheckResult, recovery_error: Option<String>, reason: String) {
        let escalation = Escalation {
            id: Uuid::new_v4(),
            component: result.component.clone(),
            severity: result.severity(),
            original_error: result.error.clone(),
            recovery_error,
            reason,
            timestamp: Utc::now(),
        };
        error!(
            component = %escalation.component,
            severity = %escalation.severity,
            reason = %escalation.reason,
            recovery_error = ?escalation.recovery_error,
            "Escalating to human operators"
        );
        if let Err(e) = self.store.insert_escalation(&escalation).await {
            warn!(component = %escalation.component, error = %e, "Failed to record escalation");
        }
    }

    fn update_metrics(&self, results: &[HealthCheckResult]) -> SystemMetrics {
        let mut state = self.state.lock();
        state.window.extend(results.iter().cloned());
        while state.window.len() > self.config.metrics_window {
            state.window.pop_front();
        }

        let performance = results
            .iter()
            .find(|r| r.component == Component::Performance);
        let metrics = aggregate_metrics(
            state.window.iter(),
            performance.and_then(|r| r.metric_f64(metric_keys::CPU_USAGE_PERCENT)),
            performance.and_then(|r| r.metric_f64(metric_keys::MEMORY_USAGE_PERCENT)),
        );
        state.last_metrics = Some(metrics.clone());
        metrics
    }
}

/// Uptime, mean latency and error rate over a window of results. An empty window counts
/// as fully up.
pub fn aggregate_metrics<'a>(
    window: impl IntoIterator<Item = &'a HealthCheckResult>,
    cpu_usage_percent: Option<f64>,
    memory_usage_percent: Option<f64>,
) -> SystemMetrics {
    let mut total = 0u64;
    let mut healthy = 0u64;
    let mut response_sum = 0u64;
    for result in window {
        total += 1;
        response_sum += result.response_time_ms;
        if result.healthy {
            healthy += 1;
        }
    }

    let (uptime_percent, avg_response_time_ms) = if total == 0 {
        (100.0, 0.0)
    } else {
        (
            healthy as f64 / total as f64 * 100.0,
            response_sum as f64 / total as f64,
        )
    };

    SystemMetrics {
        uptime_percent,
        avg_response_time_ms,
        error_rate_percent: 100.0 - uptime_percent,
        cpu_usage_percent,
        memory_usage_percent,
        timestamp: Utc::now(),
    }
}
