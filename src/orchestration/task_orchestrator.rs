//! # Task Orchestrator
//!
//! Owns the task board: a queue of pending tasks, a bounded in-flight set and the
//! dependency graph between them.
//!
//! ## Tick ordering
//!
//! 1. Promote eligible pending tasks (critical first, then FIFO) up to the free capacity
//! 2. Advance the tasks that were already running before this tick. Worker calls run
//!    on snapshots with the board lock released; outcomes are applied afterwards only to
//!    tasks still in progress
//! 3. Recompute metrics, run the quality gate and the auto-deploy check
//! 4. Persist every changed task once the board lock is released
//!
//! Because promotion runs before advancement and only looks at state at the start of
//! the tick, a task whose dependency completes in tick N is promoted in tick N+1 at the
//! earliest.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::agents::AgentRoster;
use super::metrics::DevelopmentMetrics;
use super::plan::standard_build_plan;
use super::worker::TaskWorker;
use crate::config::OrchestratorConfig;
use crate::constants::events;
use crate::error::{AutonomyError, Result};
use crate::logging::log_task_operation;
use crate::models::{
    AgentStatus, DomainType, NewTask, Priority, Task, TaskId, TaskRequirements,
};
use crate::state_machine::{
    ConcurrencyGuard, DependenciesCompleteGuard, StateGuard, TaskEvent, TaskState,
};
use crate::store::{record_event, SharedStore};

const QUALITY_TASK_DESCRIPTION: &str = "Improve code quality and coverage";
const QUALITY_TASK_HOURS: f64 = 24.0;
const DEPLOY_TASK_DESCRIPTION: &str = "Automated production deployment";
const DEPLOY_TASK_HOURS: f64 = 2.0;

/// What a single tick changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub promoted: Vec<TaskId>,
    pub completed: Vec<TaskId>,
    pub failed: Vec<TaskId>,
    /// Tasks enqueued by the quality gate or auto-deploy
    pub enqueued: Vec<TaskId>,
    pub persist_failures: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.promoted.is_empty()
            && self.completed.is_empty()
            && self.failed.is_empty()
            && self.enqueued.is_empty()
    }
}

#[derive(Debug, Default)]
struct TaskBoard {
    tasks: HashMap<TaskId, Task>,
    next_sequence: u64,
    agents: AgentRoster,
    metrics: DevelopmentMetrics,
    /// Completed non-deployment work at the time of the last automated deployment
    deployed_at_completed: Option<u64>,
}

impl TaskBoard {
    fn in_flight(&self) -> usize {
        self.tasks.values().filter(|t| t.status.is_active()).count()
    }

    fn has_open(&self, predicate: impl Fn(&Task) -> bool) -> bool {
        self.tasks
            .values()
            .any(|t| !t.is_terminal() && predicate(t))
    }

    /// Pending task ids, critical first, FIFO within a priority
    fn pending_in_order(&self) -> Vec<TaskId> {
        let mut pending: Vec<&Task> = self
            .tasks
            .values()
            .filter(|t| t.status == TaskState::Pending)
            .collect();
        pending.sort_by_key(|t| (Reverse(t.priority), t.sequence));
        pending.into_iter().map(|t| t.id).collect()
    }

    fn completed_work(&self) -> u64 {
        self.tasks
            .values()
            .filter(|t| {
                t.status == TaskState::Completed && !t.requirements.is_automated_deployment()
            })
            .count() as u64
    }

    fn insert(
        &mut self,
        new: NewTask,
        config: &OrchestratorConfig,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        if !config.domains.is_enabled(new.domain) {
            return Err(AutonomyError::Validation(format!(
                "domain {} is disabled",
                new.domain
            )));
        }
        if new.description.trim().is_empty() {
            return Err(AutonomyError::Validation(
                "task description must not be empty".to_string(),
            ));
        }
        if !(new.estimated_duration_hours.is_finite() && new.estimated_duration_hours >= 0.0) {
            return Err(AutonomyError::Validation(format!(
                "estimated duration must be a non-negative number of hours, got {}",
                new.estimated_duration_hours
            )));
        }
        if let Some(unknown) = new
            .dependencies
            .iter()
            .find(|dep| !self.tasks.contains_key(dep))
        {
            return Err(AutonomyError::Validation(format!(
                "unknown dependency {unknown}"
            )));
        }

        let task = Task::from_new(new, now, self.next_sequence);
        self.next_sequence += 1;
        self.metrics.total_tasks += 1;
        self.tasks.insert(task.id, task.clone());
        Ok(task)
    }
}

/// Dependency-aware task scheduler
#[derive(Debug)]
pub struct TaskOrchestrator {
    config: OrchestratorConfig,
    store: SharedStore,
    worker: Arc<dyn TaskWorker>,
    board: Mutex<TaskBoard>,
}

impl TaskOrchestrator {
    pub fn new(config: OrchestratorConfig, store: SharedStore, worker: Arc<dyn TaskWorker>) -> Self {
        let board = TaskBoard {
            agents: AgentRoster::new(&config.domains, Utc::now()),
            ..TaskBoard::default()
        };
        Self {
            config,
            store,
            worker,
            board: Mutex::new(board),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Append a pending task and persist it
    #[instrument(skip(self, new), fields(domain = %new.domain, priority = %new.priority))]
    pub async fn enqueue(&self, new: NewTask) -> Result<TaskId> {
        let task = {
            let mut board = self.board.lock().await;
            board.insert(new, &self.config, Utc::now())?
        };

        log_task_operation(
            "enqueue",
            Some(&task.id.to_string()),
            Some(task.domain.as_str()),
            "pending",
            Some(&task.description),
        );
        self.store.upsert_task(&task).await?;
        Ok(task.id)
    }

    /// Enqueue the standard build plan when the board is empty
    pub async fn seed_initial_plan(&self) -> Result<Vec<TaskId>> {
        let seeded = {
            let mut board = self.board.lock().await;
            if !board.tasks.is_empty() {
                debug!(tasks = board.tasks.len(), "Board not empty, skipping initial plan");
                return Ok(Vec::new());
            }

            let now = Utc::now();
            let mut ids_by_domain: HashMap<DomainType, TaskId> = HashMap::new();
            let mut seeded = Vec::new();
            for entry in standard_build_plan() {
                let domain = entry.task.domain;
                if !self.config.domains.is_enabled(domain) {
                    debug!(domain = %domain, "Domain disabled, leaving it out of the initial plan");
                    continue;
                }
                let deps: Vec<TaskId> = entry
                    .depends_on
                    .iter()
                    .filter_map(|d| ids_by_domain.get(d).copied())
                    .collect();
                let task = board.insert(entry.task.with_dependencies(deps), &self.config, now)?;
                ids_by_domain.insert(domain, task.id);
                seeded.push(task);
            }
            seeded
        };

        info!(tasks = seeded.len(), "Initialized task queue with standard build plan");
        for task in &seeded {
            self.store.upsert_task(task).await?;
        }
        Ok(seeded.into_iter().map(|t| t.id).collect())
    }

    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_at(Utc::now()).await
    }

    /// Run one scheduling pass as of `now`
    #[instrument(skip(self))]
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let mut report = TickReport::default();
        let mut gate_triggered = false;
        let mut deploy_triggered = false;

        let mut changed_ids: HashSet<TaskId> = HashSet::new();

        let running_before: Vec<Task> = {
            let mut board = self.board.lock().await;
            let running_before: Vec<Task> = board
                .tasks
                .values()
                .filter(|t| t.status.is_active())
                .cloned()
                .collect();

            // Promotion
            for id in board.pending_in_order() {
                let in_flight = running_before.len() + report.promoted.len();
                let eligible = {
                    let task = &board.tasks[&id];
                    let capacity = ConcurrencyGuard {
                        in_flight,
                        max_concurrent: self.config.max_concurrent_tasks,
                    };
                    if capacity.check(task).is_err() {
                        break;
                    }
                    DependenciesCompleteGuard::new(&board.tasks).check(task).is_ok()
                };
                if !eligible {
                    continue;
                }
                if let Some(task) = board.tasks.get_mut(&id) {
                    task.apply(TaskEvent::Start, now)?;
                    log_task_operation(
                        "promote",
                        Some(&id.to_string()),
                        Some(task.domain.as_str()),
                        "in_progress",
                        None,
                    );
                }
                report.promoted.push(id);
                changed_ids.insert(id);
            }
            running_before
        };

        // Workers run without the board lock held
        let mut outcomes: Vec<(TaskId, DomainType, TaskEvent)> = Vec::new();
        for task in &running_before {
            let elapsed = task.elapsed(now).unwrap_or_else(Duration::zero);
            let event = match self.worker.advance(task, elapsed).await {
                Ok(progress) if progress >= 1.0 => TaskEvent::Complete,
                Ok(progress) => {
                    debug!(task_id = %task.id, progress = progress, "Task still in progress");
                    continue;
                }
                Err(failure) => TaskEvent::Fail(failure.message),
            };
            outcomes.push((task.id, task.domain, event));
        }

        let changed: Vec<Task> = {
            let mut board = self.board.lock().await;

            // Advancement of tasks running before this tick
            for (id, domain, event) in outcomes {
                let Some(task) = board.tasks.get_mut(&id) else {
                    continue;
                };
                if !task.status.is_active() {
                    debug!(task_id = %id, status = %task.status, "Task left the in-flight set during the tick");
                    continue;
                }
                let target = task.apply(event.clone(), now)?;
                log_task_operation(
                    event.event_type(),
                    Some(&id.to_string()),
                    Some(domain.as_str()),
                    &target.to_string(),
                    event.error_message(),
                );
                match event {
                    TaskEvent::Fail(message) => {
                        warn!(task_id = %id, domain = %domain, error = %message, "Task failed");
                        board.agents.record_failure(domain, &message);
                        report.failed.push(id);
                    }
                    _ => {
                        board.agents.record_completion(domain);
                        report.completed.push(id);
                    }
                }
                changed_ids.insert(id);
            }

            // Metrics
            let TaskBoard { tasks, metrics, agents, .. } = &mut *board;
            metrics.recompute(tasks.values());
            agents.heartbeat(now);
            metrics.active_agents = agents.active_agent_ids();

            // Quality gate
            let threshold = self.config.quality_threshold;
            if board.metrics.code_quality < threshold
                && !board.has_open(|t| t.requirements.is_quality_improvement())
            {
                let new = NewTask::new(DomainType::Testing, Priority::High, QUALITY_TASK_DESCRIPTION)
                    .with_estimated_hours(QUALITY_TASK_HOURS)
                    .with_requirements(TaskRequirements::QualityImprovement {
                        target_quality: threshold,
                    });
                match board.insert(new, &self.config, now) {
                    Ok(task) => {
                        info!(task_id = %task.id, code_quality = board.metrics.code_quality, "Quality gate enqueued corrective testing task");
                        report.enqueued.push(task.id);
                        changed_ids.insert(task.id);
                        gate_triggered = true;
                    }
                    Err(e) => debug!(error = %e, "Quality gate could not enqueue corrective task"),
                }
            }

            // Auto-deploy
            if self.config.auto_deploy && self.should_deploy(&board) {
                let new = NewTask::new(DomainType::Deployment, Priority::High, DEPLOY_TASK_DESCRIPTION)
                    .with_estimated_hours(DEPLOY_TASK_HOURS)
                    .with_requirements(TaskRequirements::Deployment {
                        environment: "production".to_string(),
                        auto_rollback: true,
                    });
                match board.insert(new, &self.config, now) {
                    Ok(task) => {
                        info!(task_id = %task.id, "Auto-deploy enqueued production deployment");
                        board.metrics.last_deployment = Some(now);
                        board.deployed_at_completed = Some(board.completed_work());
                        report.enqueued.push(task.id);
                        changed_ids.insert(task.id);
                        deploy_triggered = true;
                    }
                    Err(e) => debug!(error = %e, "Auto-deploy could not enqueue deployment"),
                }
            }

            changed_ids
                .into_iter()
                .filter_map(|id| board.tasks.get(&id).cloned())
                .collect()
        };

        for task in &changed {
            if let Err(e) = self.store.upsert_task(task).await {
                warn!(task_id = %task.id, error = %e, "Failed to persist task");
                report.persist_failures += 1;
            }
        }
        if gate_triggered {
            record_event(
                self.store.as_ref(),
                events::QUALITY_GATE_TRIGGERED,
                "Code quality below threshold; corrective testing task enqueued",
            )
            .await;
        }
        if deploy_triggered {
            record_event(
                self.store.as_ref(),
                events::AUTO_DEPLOY_TRIGGERED,
                "Critical work complete and quality gate met; production deployment enqueued",
            )
            .await;
        }

        Ok(report)
    }

    fn should_deploy(&self, board: &TaskBoard) -> bool {
        if board.has_open(|t| t.requirements.is_automated_deployment()) {
            return false;
        }
        let critical_done = board
            .tasks
            .values()
            .filter(|t| t.priority == Priority::Critical)
            .all(|t| t.status == TaskState::Completed);
        let rearmed = board
            .deployed_at_completed
            .map_or(true, |at| board.completed_work() > at);
        critical_done && rearmed && board.metrics.code_quality >= self.config.quality_threshold
    }

    pub async fn start_agents(&self, now: DateTime<Utc>) {
        let mut board = self.board.lock().await;
        board.agents.start_all(now);
        let active = board.agents.active_agent_ids();
        board.metrics.active_agents = active;
    }

    pub async fn stop_agents(&self) {
        let mut board = self.board.lock().await;
        board.agents.stop_all();
        board.metrics.active_agents.clear();
    }

    pub async fn task(&self, id: TaskId) -> Option<Task> {
        self.board.lock().await.tasks.get(&id).cloned()
    }

    /// All tasks in enqueue order
    pub async fn tasks(&self) -> Vec<Task> {
        let board = self.board.lock().await;
        let mut tasks: Vec<Task> = board.tasks.values().cloned().collect();
        tasks.sort_by_key(|t| t.sequence);
        tasks
    }

    pub async fn in_flight(&self) -> usize {
        self.board.lock().await.in_flight()
    }

    pub async fn metrics(&self) -> DevelopmentMetrics {
        self.board.lock().await.metrics.clone()
    }

    pub async fn agents(&self) -> Vec<AgentStatus> {
        self.board.lock().await.agents.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::worker::SimulatedWorker;
    use crate::store::InMemoryStore;

    fn quiet_config(max: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrent_tasks: max,
            auto_deploy: false,
            quality_threshold: 0.0,
            ..OrchestratorConfig::default()
        }
    }

    fn orchestrator(config: OrchestratorConfig) -> (TaskOrchestrator, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let orch = TaskOrchestrator::new(config, store.clone(), Arc::new(SimulatedWorker));
        (orch, store)
    }

    #[tokio::test]
    async fn test_enqueue_rejects_unknown_dependency() {
        let (orch, _) = orchestrator(quiet_config(2));
        let err = orch
            .enqueue(
                NewTask::new(DomainType::Backend, Priority::High, "api")
                    .with_dependencies([uuid::Uuid::new_v4()]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AutonomyError::Validation(_)));
        assert!(orch.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_rejects_disabled_domain() {
        let mut config = quiet_config(2);
        config.domains.security = false;
        let (orch, _) = orchestrator(config);
        assert!(orch
            .enqueue(NewTask::new(DomainType::Security, Priority::Critical, "audit"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_enqueue_persists_and_counts() {
        let (orch, store) = orchestrator(quiet_config(2));
        let id = orch
            .enqueue(NewTask::new(DomainType::Api, Priority::Low, "hub").with_estimated_hours(3.0))
            .await
            .unwrap();
        assert_eq!(store.task(id).unwrap().status, TaskState::Pending);
        assert_eq!(orch.metrics().await.total_tasks, 1);
    }

    #[tokio::test]
    async fn test_critical_promoted_before_earlier_low() {
        let (orch, _) = orchestrator(quiet_config(1));
        let low = orch
            .enqueue(NewTask::new(DomainType::Ui, Priority::Low, "polish").with_estimated_hours(5.0))
            .await
            .unwrap();
        let critical = orch
            .enqueue(NewTask::new(DomainType::Database, Priority::Critical, "schema").with_estimated_hours(5.0))
            .await
            .unwrap();

        let report = orch.tick_at(Utc::now()).await.unwrap();
        assert_eq!(report.promoted, vec![critical]);
        assert_eq!(orch.task(low).await.unwrap().status, TaskState::Pending);
    }

    #[tokio::test]
    async fn test_quality_gate_keeps_single_open_task() {
        let config = OrchestratorConfig {
            quality_threshold: 0.8,
            auto_deploy: false,
            ..OrchestratorConfig::default()
        };
        let (orch, store) = orchestrator(config);

        let now = Utc::now();
        let first = orch.tick_at(now).await.unwrap();
        assert_eq!(first.enqueued.len(), 1);
        let second = orch.tick_at(now).await.unwrap();
        assert!(second.enqueued.is_empty());

        let tasks = orch.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, QUALITY_TASK_DESCRIPTION);
        assert_eq!(tasks[0].domain, DomainType::Testing);
        assert_eq!(store.events_of_type(events::QUALITY_GATE_TRIGGERED).len(), 1);
    }

    #[tokio::test]
    async fn test_seed_plan_only_on_empty_board() {
        let (orch, _) = orchestrator(quiet_config(10));
        let seeded = orch.seed_initial_plan().await.unwrap();
        assert_eq!(seeded.len(), 10);
        assert!(orch.seed_initial_plan().await.unwrap().is_empty());

        let tasks = orch.tasks().await;
        let backend = tasks.iter().find(|t| t.domain == DomainType::Backend).unwrap();
        let database = tasks.iter().find(|t| t.domain == DomainType::Database).unwrap();
        assert!(backend.dependencies.contains(&database.id));
    }

    #[tokio::test]
    async fn test_agents_track_completions() {
        let (orch, _) = orchestrator(quiet_config(1));
        orch.start_agents(Utc::now()).await;
        orch.enqueue(NewTask::new(DomainType::Api, Priority::Medium, "instant"))
            .await
            .unwrap();

        let now = Utc::now();
        orch.tick_at(now).await.unwrap();
        let report = orch.tick_at(now).await.unwrap();
        assert_eq!(report.completed.len(), 1);

        let agents = orch.agents().await;
        let api = agents.iter().find(|a| a.agent_type == DomainType::Api).unwrap();
        assert_eq!(api.tasks_completed, 1);
        assert_eq!(orch.metrics().await.active_agents.len(), 10);
    }
}
