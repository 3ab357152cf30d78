//! Test doubles for the async seams: probes, recovery, workers, portals, mitigation and
//! notification sinks

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use parking_lot::Mutex;

use tms_autonomy::health::{HealthProbe, ProbeError, ProbeOutcome, RecoveryError, RecoveryHandler};
use tms_autonomy::models::{Component, HealthCheckResult, PortalStatus, Task};
use tms_autonomy::notifications::{Alert, NotificationError, NotificationSink};
use tms_autonomy::orchestration::{TaskFailure, TaskWorker};
use tms_autonomy::slo::{MitigationHooks, PortalProbe, PortalSample, SloBreach};

/// Probe that sleeps, then reports a fixed outcome
#[derive(Debug)]
pub struct StubProbe {
    component: Component,
    delay: Duration,
    healthy: bool,
    calls: AtomicUsize,
}

impl StubProbe {
    pub fn healthy(component: impl Into<Component>) -> Self {
        Self::new(component.into(), Duration::ZERO, true)
    }

    pub fn unhealthy(component: impl Into<Component>) -> Self {
        Self::new(component.into(), Duration::ZERO, false)
    }

    pub fn slow(component: impl Into<Component>, delay: Duration, healthy: bool) -> Self {
        Self::new(component.into(), delay, healthy)
    }

    fn new(component: Component, delay: Duration, healthy: bool) -> Self {
        Self {
            component,
            delay,
            healthy,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for StubProbe {
    fn component(&self) -> Component {
        self.component.clone()
    }

    async fn probe(&self) -> Result<ProbeOutcome, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.healthy {
            Ok(ProbeOutcome::healthy())
        } else {
            Ok(ProbeOutcome::unhealthy(format!("{} is down", self.component)))
        }
    }
}

/// Recovery handler that counts invocations and optionally fails
#[derive(Debug, Default)]
pub struct CountingRecovery {
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl CountingRecovery {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryHandler for CountingRecovery {
    async fn recover(&self, _result: &HealthCheckResult) -> Result<(), RecoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(RecoveryError::Failed(message.clone())),
            None => Ok(()),
        }
    }
}

/// Completes every task on its first advancement, except the descriptions listed as failing
#[derive(Debug, Default)]
pub struct ScriptedWorker {
    failing: HashSet<String>,
}

impl ScriptedWorker {
    pub fn completing() -> Self {
        Self::default()
    }

    pub fn failing_on(descriptions: &[&str]) -> Self {
        Self {
            failing: descriptions.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[async_trait]
impl TaskWorker for ScriptedWorker {
    async fn advance(&self, task: &Task, _elapsed: ChronoDuration) -> Result<f64, TaskFailure> {
        if self.failing.contains(&task.description) {
            Err(TaskFailure::new(format!("{} crashed", task.description)))
        } else {
            Ok(1.0)
        }
    }
}

/// Never finishes anything
#[derive(Debug, Default)]
pub struct StalledWorker;

#[async_trait]
impl TaskWorker for StalledWorker {
    async fn advance(&self, _task: &Task, _elapsed: ChronoDuration) -> Result<f64, TaskFailure> {
        Ok(0.0)
    }
}

/// Completes every task, but only after sleeping for `delay`
#[derive(Debug)]
pub struct SlowWorker {
    pub delay: Duration,
}

#[async_trait]
impl TaskWorker for SlowWorker {
    async fn advance(&self, _task: &Task, _elapsed: ChronoDuration) -> Result<f64, TaskFailure> {
        tokio::time::sleep(self.delay).await;
        Ok(1.0)
    }
}

/// Returns the configured sample per portal, or a healthy 100ms sample
#[derive(Debug, Default)]
pub struct ScriptedPortalProbe {
    samples: Mutex<Vec<(String, PortalSample)>>,
}

impl ScriptedPortalProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, portal: &str, sample: PortalSample) -> Self {
        self.samples.lock().push((portal.to_string(), sample));
        self
    }
}

#[async_trait]
impl PortalProbe for ScriptedPortalProbe {
    async fn sample(&self, portal: &str) -> Result<PortalSample, ProbeError> {
        let samples = self.samples.lock();
        Ok(samples
            .iter()
            .find(|(name, _)| name == portal)
            .map(|(_, sample)| sample.clone())
            .unwrap_or_else(|| PortalSample::ok(100.0)))
    }
}

/// Records every mitigation call
#[derive(Debug, Default)]
pub struct RecordingMitigation {
    pub throttled: Mutex<Vec<String>>,
    pub system_breaches: Mutex<Vec<Vec<SloBreach>>>,
    pub rollbacks: Mutex<Vec<String>>,
}

#[async_trait]
impl MitigationHooks for RecordingMitigation {
    async fn mitigate_portal(&self, portal: &PortalStatus) {
        self.throttled.lock().push(portal.name.clone());
    }

    async fn mitigate_system(&self, breaches: &[SloBreach]) {
        self.system_breaches.lock().push(breaches.to_vec());
    }

    async fn request_rollback(&self, reason: &str) {
        self.rollbacks.lock().push(reason.to_string());
    }
}

/// Notification sink that keeps every alert it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub alerts: Mutex<Vec<Alert>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}

/// Let spawned fire-and-forget work run to completion
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
