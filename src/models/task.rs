//! # Task Model
//!
//! A unit of development work on the orchestration board. Tasks are created by callers
//! or by the orchestrator's own quality gate / auto-deploy logic, mutated only by the
//! orchestrator loop, and never deleted.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::MILLIS_PER_HOUR;
use crate::state_machine::{StateMachineResult, TaskEvent, TaskState, TaskStateMachine};

pub type TaskId = Uuid;

/// Work domains. Each domain has one agent and a relative working speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainType {
    Research,
    Frontend,
    Backend,
    Database,
    Testing,
    Deployment,
    Ui,
    Portal,
    Api,
    Security,
}

impl DomainType {
    pub const ALL: [DomainType; 10] = [
        Self::Research,
        Self::Frontend,
        Self::Backend,
        Self::Database,
        Self::Testing,
        Self::Deployment,
        Self::Ui,
        Self::Portal,
        Self::Api,
        Self::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Database => "database",
            Self::Testing => "testing",
            Self::Deployment => "deployment",
            Self::Ui => "ui",
            Self::Portal => "portal",
            Self::Api => "api",
            Self::Security => "security",
        }
    }

    /// Relative working speed of the domain's agent (1.0 = nominal)
    pub fn speed_factor(&self) -> f64 {
        match self {
            Self::Research => 0.5,
            Self::Database => 1.0,
            Self::Backend => 0.8,
            Self::Frontend => 0.7,
            Self::Ui => 0.6,
            Self::Portal => 0.8,
            Self::Api => 0.9,
            Self::Security => 0.7,
            Self::Testing => 1.2,
            Self::Deployment => 1.0,
        }
    }

    /// Factor applied to the estimated duration: faster domains finish sooner
    pub fn duration_multiplier(&self) -> f64 {
        1.0 / self.speed_factor()
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DomainType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Invalid domain type: {s}"))
    }
}

/// Priority shared by tasks and decisions. Ordering is `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid priority: {s}")),
        }
    }
}

/// Typed task requirements. `Custom` keeps caller-supplied payloads opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum TaskRequirements {
    #[default]
    None,
    Research {
        scope: String,
        timeframe: String,
    },
    Schema {
        entities: Vec<String>,
    },
    Endpoints {
        endpoints: Vec<String>,
    },
    Interface {
        components: Vec<String>,
    },
    Compliance {
        standards: Vec<String>,
        features: Vec<String>,
    },
    TestSuite {
        coverage_percent: u8,
        types: Vec<String>,
    },
    QualityImprovement {
        target_quality: f64,
    },
    Deployment {
        environment: String,
        auto_rollback: bool,
    },
    Custom(Value),
}

impl TaskRequirements {
    pub fn is_quality_improvement(&self) -> bool {
        matches!(self, Self::QualityImprovement { .. })
    }

    pub fn is_automated_deployment(&self) -> bool {
        matches!(self, Self::Deployment { auto_rollback: true, .. })
    }
}

/// Caller-facing description of a task to enqueue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub domain: DomainType,
    pub priority: Priority,
    pub description: String,
    #[serde(default)]
    pub requirements: TaskRequirements,
    /// Defaults to the domain's agent
    #[serde(default)]
    pub assigned_agent: Option<String>,
    #[serde(default)]
    pub estimated_duration_hours: f64,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
}

impl NewTask {
    pub fn new(domain: DomainType, priority: Priority, description: impl Into<String>) -> Self {
        Self {
            domain,
            priority,
            description: description.into(),
            requirements: TaskRequirements::None,
            assigned_agent: None,
            estimated_duration_hours: 0.0,
            dependencies: Vec::new(),
        }
    }

    pub fn with_estimated_hours(mut self, hours: f64) -> Self {
        self.estimated_duration_hours = hours;
        self
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    pub fn with_requirements(mut self, requirements: TaskRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.assigned_agent = Some(agent.into());
        self
    }
}

/// A task on the board. Also the persisted task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub domain: DomainType,
    pub priority: Priority,
    pub status: TaskState,
    pub description: String,
    pub requirements: TaskRequirements,
    pub assigned_agent: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub estimated_duration_hours: f64,
    pub actual_duration_hours: Option<f64>,
    pub dependencies: BTreeSet<TaskId>,
    pub output: Option<Value>,
    pub errors: Vec<String>,
    /// Enqueue order, used as the FIFO tie-breaker within a priority
    #[serde(default)]
    pub sequence: u64,
}

impl Task {
    pub(crate) fn from_new(new: NewTask, now: DateTime<Utc>, sequence: u64) -> Self {
        let assigned_agent = new
            .assigned_agent
            .unwrap_or_else(|| new.domain.as_str().to_string());
        Self {
            id: Uuid::new_v4(),
            domain: new.domain,
            priority: new.priority,
            status: TaskState::Pending,
            description: new.description,
            requirements: new.requirements,
            assigned_agent,
            created_at: now,
            updated_at: now,
            started_at: None,
            estimated_duration_hours: new.estimated_duration_hours,
            actual_duration_hours: None,
            dependencies: new.dependencies.into_iter().collect(),
            output: None,
            errors: Vec::new(),
            sequence,
        }
    }

    /// Apply a lifecycle event, updating timestamps, duration and error list
    pub fn apply(&mut self, event: TaskEvent, now: DateTime<Utc>) -> StateMachineResult<TaskState> {
        let target = TaskStateMachine::determine_target_state(self.status, &event)?;

        match &event {
            TaskEvent::Start => self.started_at = Some(now),
            TaskEvent::Complete => {
                let millis = (now - self.created_at).num_milliseconds().max(0) as f64;
                self.actual_duration_hours = Some(millis / MILLIS_PER_HOUR);
            }
            TaskEvent::Fail(message) => self.errors.push(message.clone()),
        }

        self.status = target;
        self.updated_at = now;
        Ok(target)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Time spent in progress so far, if the task has started
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.started_at.map(|started| now - started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_duration_multiplier_makes_testing_faster() {
        assert!(DomainType::Testing.duration_multiplier() < 1.0);
        assert!(DomainType::Research.duration_multiplier() > 1.0);
        assert!((DomainType::Research.duration_multiplier() - 2.0).abs() < f64::EPSILON);
        assert!((DomainType::Database.duration_multiplier() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_domain_parse_round_trip() {
        for domain in DomainType::ALL {
            assert_eq!(domain.as_str().parse::<DomainType>().unwrap(), domain);
        }
        assert!("mobile".parse::<DomainType>().is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_from_new_defaults_agent_to_domain() {
        let task = Task::from_new(
            NewTask::new(DomainType::Database, Priority::High, "schema"),
            Utc::now(),
            7,
        );
        assert_eq!(task.assigned_agent, "database");
        assert_eq!(task.status, TaskState::Pending);
        assert_eq!(task.sequence, 7);
        assert!(task.started_at.is_none());
    }

    #[test]
    fn test_apply_lifecycle_records_timing_and_errors() {
        let created = Utc::now();
        let mut task = Task::from_new(
            NewTask::new(DomainType::Api, Priority::Low, "endpoints"),
            created,
            0,
        );

        let started = created + Duration::minutes(30);
        task.apply(TaskEvent::Start, started).unwrap();
        assert_eq!(task.started_at, Some(started));
        assert_eq!(task.elapsed(started + Duration::hours(1)), Some(Duration::hours(1)));

        let finished = created + Duration::hours(2);
        task.apply(TaskEvent::Complete, finished).unwrap();
        assert_eq!(task.status, TaskState::Completed);
        assert!((task.actual_duration_hours.unwrap() - 2.0).abs() < 1e-9);

        let mut failing = Task::from_new(
            NewTask::new(DomainType::Api, Priority::Low, "flaky"),
            created,
            1,
        );
        failing.apply(TaskEvent::Start, created).unwrap();
        failing
            .apply(TaskEvent::Fail("upstream timeout".to_string()), created)
            .unwrap();
        assert_eq!(failing.errors, vec!["upstream timeout".to_string()]);
        assert!(failing.actual_duration_hours.is_none());
    }

    #[test]
    fn test_requirements_serialize_with_kind_tag() {
        let req = TaskRequirements::Deployment {
            environment: "production".to_string(),
            auto_rollback: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["kind"], "deployment");
        assert_eq!(json["details"]["auto_rollback"], true);
        assert!(req.is_automated_deployment());
    }
}
