//! # SLO Guard
//!
//! Samples portals, throttles any portal over its error budget and evaluates the
//! system-wide uptime, success-rate and p95 latency objectives. Mitigation hooks run on
//! spawned tasks so a slow hook never stalls a sweep.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::mitigation::MitigationHooks;
use super::portals::{PortalProbe, PortalRegistry, PortalSample};
use crate::config::SloConfig;
use crate::models::{PortalStatus, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SloKind {
    Uptime,
    SuccessRate,
    P95Latency,
}

impl fmt::Display for SloKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uptime => "uptime",
            Self::SuccessRate => "success_rate",
            Self::P95Latency => "p95_latency",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SloBreach {
    pub slo: SloKind,
    pub threshold: f64,
    pub actual: f64,
    pub severity: Severity,
}

impl SloBreach {
    pub fn describe(&self) -> String {
        match self.slo {
            SloKind::P95Latency => format!(
                "{} SLO breached: {:.3}s above {:.3}s ({})",
                self.slo, self.actual, self.threshold, self.severity
            ),
            _ => format!(
                "{} SLO breached: {:.3}% below {:.3}% ({})",
                self.slo, self.actual, self.threshold, self.severity
            ),
        }
    }
}

/// System-wide aggregate over sampled, enabled portals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SloSnapshot {
    pub uptime_percent: f64,
    pub success_rate_percent: f64,
    pub p95_seconds: f64,
    pub portals: usize,
}

/// Nearest-rank 95th percentile
pub fn p95_nearest_rank(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (0.95 * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.clamp(1, sorted.len()) - 1])
}

pub fn aggregate(portals: &[PortalStatus]) -> Option<SloSnapshot> {
    if portals.is_empty() {
        return None;
    }
    let count = portals.len() as f64;
    let uptime = portals.iter().map(|p| p.performance.uptime).sum::<f64>() / count;
    let error_rate = portals.iter().map(|p| p.performance.error_rate).sum::<f64>() / count;
    let latencies: Vec<f64> = portals
        .iter()
        .map(|p| p.performance.response_time_ms / 1000.0)
        .collect();

    Some(SloSnapshot {
        uptime_percent: uptime,
        success_rate_percent: 100.0 - error_rate,
        p95_seconds: p95_nearest_rank(&latencies).unwrap_or(0.0),
        portals: portals.len(),
    })
}

pub fn evaluate(snapshot: &SloSnapshot, config: &SloConfig) -> Vec<SloBreach> {
    let mut breaches = Vec::new();
    if snapshot.uptime_percent < config.uptime_min_percent {
        breaches.push(SloBreach {
            slo: SloKind::Uptime,
            threshold: config.uptime_min_percent,
            actual: snapshot.uptime_percent,
            severity: Severity::Critical,
        });
    }
    if snapshot.success_rate_percent < config.success_rate_min_percent {
        breaches.push(SloBreach {
            slo: SloKind::SuccessRate,
            threshold: config.success_rate_min_percent,
            actual: snapshot.success_rate_percent,
            severity: Severity::High,
        });
    }
    if snapshot.p95_seconds > config.p95_max_seconds {
        breaches.push(SloBreach {
            slo: SloKind::P95Latency,
            threshold: config.p95_max_seconds,
            actual: snapshot.p95_seconds,
            severity: Severity::High,
        });
    }
    breaches
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortalSweep {
    pub sampled: usize,
    pub throttled: Vec<String>,
}

/// Portal monitoring and system SLO checks. Mitigation hooks always run on spawned tasks.
#[derive(Debug)]
pub struct SloGuard {
    config: SloConfig,
    portals: PortalRegistry,
    probe: Option<Arc<dyn PortalProbe>>,
    hooks: Arc<dyn MitigationHooks>,
}

impl SloGuard {
    pub fn new(
        config: SloConfig,
        probe: Option<Arc<dyn PortalProbe>>,
        hooks: Arc<dyn MitigationHooks>,
    ) -> Self {
        let portals = PortalRegistry::new(config.portals.iter().cloned(), config.availability_window);
        Self {
            config,
            portals,
            probe,
            hooks,
        }
    }

    pub fn config(&self) -> &SloConfig {
        &self.config
    }

    pub fn portals(&self) -> &PortalRegistry {
        &self.portals
    }

    /// Sample every enabled portal and throttle those over the error budget
    #[instrument(skip(self))]
    pub async fn monitor_portals(&self) -> PortalSweep {
        let Some(probe) = &self.probe else {
            debug!("No portal probe configured, skipping sweep");
            return PortalSweep::default();
        };

        let names = self.portals.enabled_names();
        let samples = join_all(names.iter().map(|name| async move {
            let started = Instant::now();
            let sample = match probe.sample(name).await {
                Ok(sample) => sample,
                Err(e) => {
                    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                    PortalSample::failed(elapsed_ms, e.to_string())
                }
            };
            (name, sample)
        }))
        .await;

        let mut sweep = PortalSweep {
            sampled: samples.len(),
            throttled: Vec::new(),
        };
        for (name, sample) in samples {
            if let Some(name) = self.observe(name, &sample) {
                sweep.throttled.push(name);
            }
        }
        sweep
    }

    /// Record one sample; returns the portal name when it was throttled
    pub fn observe(&self, portal: &str, sample: &PortalSample) -> Option<String> {
        let status = self.portals.record(portal, sample, Utc::now())?;
        if status.performance.error_rate <= self.config.max_error_rate_percent() {
            return None;
        }

        warn!(
            portal = %status.name,
            error_rate = status.performance.error_rate,
            budget = self.config.max_error_rate_percent(),
            "Portal over error budget"
        );
        let hooks = Arc::clone(&self.hooks);
        let name = status.name.clone();
        tokio::spawn(async move {
            hooks.mitigate_portal(&status).await;
        });
        Some(name)
    }

    pub fn system_snapshot(&self) -> Option<SloSnapshot> {
        let sampled: Vec<PortalStatus> = self
            .portals
            .snapshot()
            .into_iter()
            .filter(|p| p.enabled && p.samples > 0)
            .collect();
        aggregate(&sampled)
    }

    /// Compare the system snapshot against thresholds and spawn mitigation for breaches
    #[instrument(skip(self))]
    pub fn check_slos(&self) -> Vec<SloBreach> {
        let Some(snapshot) = self.system_snapshot() else {
            debug!("No sampled portals, SLO check skipped");
            return Vec::new();
        };

        let breaches = evaluate(&snapshot, &self.config);
        if breaches.is_empty() {
            debug!(
                uptime_percent = snapshot.uptime_percent,
                success_rate_percent = snapshot.success_rate_percent,
                p95_seconds = snapshot.p95_seconds,
                "SLOs within thresholds"
            );
            return breaches;
        }

        for breach in &breaches {
            warn!(
                slo = %breach.slo,
                threshold = breach.threshold,
                actual = breach.actual,
                severity = %breach.severity,
                "SLO breach"
            );
        }

        let critical = breaches
            .iter()
            .find(|b| b.severity == Severity::Critical)
            .map(SloBreach::describe);
        if critical.is_some() {
            info!("Critical SLO breach, requesting rollback");
        }

        let hooks = Arc::clone(&self.hooks);
        let spawned = breaches.clone();
        tokio::spawn(async move {
            hooks.mitigate_system(&spawned).await;
            if let Some(reason) = critical {
                hooks.request_rollback(&reason).await;
            }
        });
        breaches
    }
}
