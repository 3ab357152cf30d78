//! In-process store. Keeps records in memory behind a `parking_lot` mutex and can
//! simulate an outage for resilience drills. Append-only tables keep the newest
//! `retention` rows; tasks and flags are keyed and never trimmed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DurableStore, StoreError, StoreResult};
use crate::constants::tables;
use crate::models::{
    DecisionRecord, Escalation, HealthCheckResult, Issue, SystemEvent, SystemMetrics, Task, TaskId,
};

#[derive(Debug, Default)]
struct Tables {
    tasks: HashMap<TaskId, Task>,
    task_upserts: u64,
    decisions: VecDeque<DecisionRecord>,
    health_checks: VecDeque<HealthCheckResult>,
    issues: VecDeque<Issue>,
    escalations: VecDeque<Escalation>,
    system_metrics: VecDeque<SystemMetrics>,
    system_events: VecDeque<SystemEvent>,
    flags: HashMap<(String, String), bool>,
}

#[derive(Debug)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    retention: usize,
    available: AtomicBool,
    reconnects: AtomicU64,
}

/// Rows kept per append-only table unless configured otherwise
pub const DEFAULT_RETENTION: usize = 10_000;

fn append<T>(table: &mut VecDeque<T>, rows: impl IntoIterator<Item = T>, retention: usize) {
    table.extend(rows);
    let excess = table.len().saturating_sub(retention);
    table.drain(..excess);
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Keep at most `retention` rows per append-only table (minimum 1)
    pub fn with_retention(retention: usize) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            retention: retention.max(1),
            available: AtomicBool::new(true),
            reconnects: AtomicU64::new(0),
        }
    }

    /// Toggle a simulated outage; while unavailable every call fails
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn guard(&self, table: &'static str) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("{table}: simulated outage")))
        }
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.tables.lock().tasks.get(&id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tables.lock().tasks.values().cloned().collect();
        tasks.sort_by_key(|t| t.sequence);
        tasks
    }

    pub fn task_upserts(&self) -> u64 {
        self.tables.lock().task_upserts
    }

    pub fn decisions(&self) -> Vec<DecisionRecord> {
        self.tables.lock().decisions.iter().cloned().collect()
    }

    pub fn health_checks(&self) -> Vec<HealthCheckResult> {
        self.tables.lock().health_checks.iter().cloned().collect()
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.tables.lock().issues.iter().cloned().collect()
    }

    pub fn escalations(&self) -> Vec<Escalation> {
        self.tables.lock().escalations.iter().cloned().collect()
    }

    pub fn system_metrics(&self) -> Vec<SystemMetrics> {
        self.tables.lock().system_metrics.iter().cloned().collect()
    }

    pub fn system_events(&self) -> Vec<SystemEvent> {
        self.tables.lock().system_events.iter().cloned().collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<SystemEvent> {
        self.tables
            .lock()
            .system_events
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn upsert_task(&self, task: &Task) -> StoreResult<()> {
        self.guard(tables::TASKS)?;
        let mut tables = self.tables.lock();
        tables.tasks.insert(task.id, task.clone());
        tables.task_upserts += 1;
        Ok(())
    }

    async fn insert_decision(&self, record: &DecisionRecord) -> StoreResult<()> {
        self.guard(tables::DECISIONS)?;
        append(&mut self.tables.lock().decisions, [record.clone()], self.retention);
        Ok(())
    }

    async fn insert_health_checks(&self, results: &[HealthCheckResult]) -> StoreResult<()> {
        self.guard(tables::HEALTH_CHECKS)?;
        append(&mut self.tables.lock().health_checks, results.iter().cloned(), self.retention);
        Ok(())
    }

    async fn insert_issue(&self, issue: &Issue) -> StoreResult<()> {
        self.guard(tables::ISSUES)?;
        append(&mut self.tables.lock().issues, [issue.clone()], self.retention);
        Ok(())
    }

    async fn insert_escalation(&self, escalation: &Escalation) -> StoreResult<()> {
        self.guard(tables::ESCALATIONS)?;
        append(&mut self.tables.lock().escalations, [escalation.clone()], self.retention);
        Ok(())
    }

    async fn insert_system_metrics(&self, metrics: &SystemMetrics) -> StoreResult<()> {
        self.guard(tables::SYSTEM_METRICS)?;
        append(&mut self.tables.lock().system_metrics, [metrics.clone()], self.retention);
        Ok(())
    }

    async fn insert_system_event(&self, event: &SystemEvent) -> StoreResult<()> {
        self.guard(tables::SYSTEM_EVENTS)?;
        append(&mut self.tables.lock().system_events, [event.clone()], self.retention);
        Ok(())
    }

    async fn get_flag(&self, key: &str, scope: &str) -> StoreResult<Option<bool>> {
        self.guard(tables::FEATURE_FLAGS)?;
        Ok(self
            .tables
            .lock()
            .flags
            .get(&(key.to_string(), scope.to_string()))
            .copied())
    }

    async fn set_flag(&self, key: &str, scope: &str, value: bool) -> StoreResult<()> {
        self.guard(tables::FEATURE_FLAGS)?;
        self.tables
            .lock()
            .flags
            .insert((key.to_string(), scope.to_string()), value);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Connection("simulated outage".to_string()))
        }
    }

    async fn reconnect(&self) -> StoreResult<()> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        self.ping().await
    }
}
