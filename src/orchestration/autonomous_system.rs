//! # Autonomous System
//!
//! Wires the task orchestrator, health monitor, SLO guard and decision engine together
//! and drives them from four periodic loops (task, health, portal, SLO).
//!
//! Loops are spawned once, on the first successful `start()`, and stay scheduled for the
//! lifetime of the system. Each tick checks the run gate first: while the system is
//! stopped or the emergency stop is engaged the tick does nothing. The SLO loop also
//! re-reads the persisted emergency-stop flag so a stop issued by another instance halts
//! this one.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use super::metrics::DevelopmentMetrics;
use super::task_orchestrator::TaskOrchestrator;
use crate::config::AutonomyConfig;
use crate::constants::events;
use crate::decision::DecisionEngine;
use crate::error::{AutonomyError, Result};
use crate::health::HealthMonitor;
use crate::models::{AgentStatus, DecisionInput, DecisionResult, PortalStatus, SystemMetrics};
use crate::slo::{KillSwitch, SloGuard};
use crate::store::{record_event, SharedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Task,
    Health,
    Portal,
    Slo,
}

impl LoopKind {
    pub const ALL: [LoopKind; 4] = [Self::Task, Self::Health, Self::Portal, Self::Slo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Health => "health",
            Self::Portal => "portal",
            Self::Slo => "slo",
        }
    }

    fn error_event(&self) -> &'static str {
        match self {
            Self::Task => events::TASK_LOOP_ERROR,
            Self::Health => events::HEALTH_LOOP_ERROR,
            Self::Portal => events::PORTAL_LOOP_ERROR,
            Self::Slo => events::SLO_LOOP_ERROR,
        }
    }
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the whole system
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub running: bool,
    pub emergency_stopped: bool,
    pub loops_scheduled: usize,
    pub agents: Vec<AgentStatus>,
    pub metrics: DevelopmentMetrics,
    pub portals: Vec<PortalStatus>,
    pub last_health_metrics: Option<SystemMetrics>,
}

#[derive(Debug)]
struct SystemInner {
    config: AutonomyConfig,
    store: SharedStore,
    orchestrator: TaskOrchestrator,
    decisions: DecisionEngine,
    health: HealthMonitor,
    slo: SloGuard,
    kill_switch: KillSwitch,
    running: AtomicBool,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl SystemInner {
    fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.kill_switch.is_engaged()
    }

    fn period(&self, kind: LoopKind) -> Duration {
        match kind {
            LoopKind::Task => self.config.orchestrator.task_tick_interval(),
            LoopKind::Health | LoopKind::Portal => self.config.orchestrator.monitoring_interval(),
            LoopKind::Slo => self.config.slo.check_interval(),
        }
    }

    async fn run_tick(&self, kind: LoopKind) -> Result<()> {
        match kind {
            LoopKind::Task => {
                let report = self.orchestrator.tick().await?;
                if !report.is_idle() {
                    debug!(
                        promoted = report.promoted.len(),
                        completed = report.completed.len(),
                        failed = report.failed.len(),
                        enqueued = report.enqueued.len(),
                        "Task tick"
                    );
                }
                if report.persist_failures > 0 {
                    return Err(AutonomyError::Orchestration(format!(
                        "{} task updates could not be persisted",
                        report.persist_failures
                    )));
                }
            }
            LoopKind::Health => {
                self.health.run_checks().await;
            }
            LoopKind::Portal => {
                let sweep = self.slo.monitor_portals().await;
                if !sweep.throttled.is_empty() {
                    info!(throttled = ?sweep.throttled, "Portals throttled");
                }
            }
            LoopKind::Slo => {
                self.slo.check_slos();
            }
        }
        Ok(())
    }

    /// Pick up a stop issued elsewhere; store errors keep the last known state
    async fn sync_kill_switch(&self) {
        match self.kill_switch.refresh().await {
            Ok(true) if self.running.swap(false, Ordering::SeqCst) => {
                warn!("🛑 Emergency stop detected in store, halting");
                self.orchestrator.stop_agents().await;
                record_event(
                    self.store.as_ref(),
                    events::REMOTE_STOP_DETECTED,
                    "emergency stop flag set by another instance",
                )
                .await;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Could not refresh emergency stop flag"),
        }
    }
}

fn spawn_loop(inner: Weak<SystemInner>, kind: LoopKind, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(system) = inner.upgrade() else {
                debug!(loop_kind = %kind, "System dropped, loop exiting");
                return;
            };

            if kind == LoopKind::Slo {
                system.sync_kill_switch().await;
            }
            if !system.is_active() {
                continue;
            }

            // Run the body on its own task so a panic is reported like any other error
            let tick_system = Arc::clone(&system);
            let outcome = tokio::spawn(async move { tick_system.run_tick(kind).await }).await;
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(join_error) => Some(format!("tick panicked: {join_error}")),
            };
            if let Some(message) = failure {
                error!(loop_kind = %kind, error = %message, "Loop tick failed");
                record_event(system.store.as_ref(), kind.error_event(), message).await;
            }
        }
    })
}

/// Handle to a running autonomy core. Cloning shares the same system.
#[derive(Debug, Clone)]
pub struct AutonomousSystem {
    inner: Arc<SystemInner>,
}

impl AutonomousSystem {
    pub(crate) fn from_parts(
        config: AutonomyConfig,
        store: SharedStore,
        orchestrator: TaskOrchestrator,
        decisions: DecisionEngine,
        health: HealthMonitor,
        slo: SloGuard,
    ) -> Self {
        let kill_switch = KillSwitch::new(Arc::clone(&store));
        Self {
            inner: Arc::new(SystemInner {
                config,
                store,
                orchestrator,
                decisions,
                health,
                slo,
                kill_switch,
                running: AtomicBool::new(false),
                loops: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start the system. The persisted emergency-stop flag is always re-read first; when
    /// it is set this returns [`AutonomyError::EmergencyStopActive`] and nothing starts.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.kill_switch.refresh().await? {
            warn!("Start blocked by emergency stop");
            record_event(
                inner.store.as_ref(),
                events::SYSTEM_START_BLOCKED,
                "start refused while emergency stop is engaged",
            )
            .await;
            return Err(AutonomyError::EmergencyStopActive);
        }
        if inner.running.load(Ordering::SeqCst) {
            debug!("System already running");
            return Ok(());
        }

        if inner.config.orchestrator.seed_initial_plan && inner.orchestrator.tasks().await.is_empty() {
            let seeded = inner.orchestrator.seed_initial_plan().await?;
            info!(tasks = seeded.len(), "Seeded initial build plan");
        }

        inner.orchestrator.start_agents(Utc::now()).await;
        inner.running.store(true, Ordering::SeqCst);
        self.spawn_loops();

        info!(
            task_tick_ms = inner.config.orchestrator.task_tick_interval_ms,
            monitoring_ms = inner.config.orchestrator.monitoring_interval_ms,
            slo_ms = inner.config.slo.check_interval_ms,
            "🚀 Autonomous system started"
        );
        record_event(inner.store.as_ref(), events::SYSTEM_STARTED, "autonomous system started").await;
        Ok(())
    }

    fn spawn_loops(&self) {
        let mut loops = self.inner.loops.lock();
        if !loops.is_empty() {
            return;
        }
        for kind in LoopKind::ALL {
            let period = self.inner.period(kind);
            loops.push(spawn_loop(Arc::downgrade(&self.inner), kind, period));
        }
    }

    /// Regular stop; loops stay scheduled and idle
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inner.orchestrator.stop_agents().await;
        info!("Autonomous system stopped");
        record_event(self.inner.store.as_ref(), events::SYSTEM_STOPPED, "autonomous system stopped").await;
    }

    /// Engage the global emergency stop. Work halts locally even when the flag cannot be
    /// persisted; the store error is still returned.
    #[instrument(skip(self))]
    pub async fn emergency_stop(&self) -> Result<()> {
        let inner = &self.inner;
        let already_engaged = inner.kill_switch.is_engaged();
        let persisted = inner.kill_switch.engage().await;

        inner.running.store(false, Ordering::SeqCst);
        inner.orchestrator.stop_agents().await;

        if !already_engaged {
            error!("🛑 EMERGENCY STOP engaged");
            record_event(
                inner.store.as_ref(),
                events::EMERGENCY_STOP_TRIGGERED,
                "emergency stop engaged",
            )
            .await;
        }
        persisted.map_err(AutonomyError::from)
    }

    /// Clear the emergency stop and run the full start sequence again
    #[instrument(skip(self))]
    pub async fn resume(&self) -> Result<()> {
        self.inner.kill_switch.release().await?;
        info!("Emergency stop cleared");
        record_event(
            self.inner.store.as_ref(),
            events::EMERGENCY_STOP_CLEARED,
            "emergency stop cleared",
        )
        .await;
        self.start().await
    }

    /// Abort the periodic loops. The system cannot be restarted afterwards.
    pub async fn shutdown(&self) {
        self.stop().await;
        let handles: Vec<JoinHandle<()>> = self.inner.loops.lock().drain(..).collect();
        for handle in handles {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.inner.kill_switch.is_engaged()
    }

    pub fn loops_scheduled(&self) -> usize {
        self.inner.loops.lock().len()
    }

    /// Run one tick of the given loop now, honouring the run gate
    pub async fn run_once(&self, kind: LoopKind) -> Result<()> {
        if kind == LoopKind::Slo {
            self.inner.sync_kill_switch().await;
        }
        if !self.inner.is_active() {
            return Ok(());
        }
        self.inner.run_tick(kind).await
    }

    pub async fn decide(&self, input: DecisionInput) -> DecisionResult {
        self.inner.decisions.decide(input).await
    }

    pub fn config(&self) -> &AutonomyConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.inner.store
    }

    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.inner.orchestrator
    }

    pub fn decisions(&self) -> &DecisionEngine {
        &self.inner.decisions
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.inner.health
    }

    pub fn slo(&self) -> &SloGuard {
        &self.inner.slo
    }

    pub async fn status(&self) -> SystemStatus {
        SystemStatus {
            running: self.is_running(),
            emergency_stopped: self.is_emergency_stopped(),
            loops_scheduled: self.loops_scheduled(),
            agents: self.inner.orchestrator.agents().await,
            metrics: self.inner.orchestrator.metrics().await,
            portals: self.inner.slo.portals().snapshot(),
            last_health_metrics: self.inner.health.last_metrics(),
        }
    }
}
