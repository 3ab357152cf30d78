//! Task progress seam.
//!
//! The orchestrator never does the work itself; it asks a [`TaskWorker`] how far an
//! in-progress task has come. [`SimulatedWorker`] derives progress from wall-clock time
//! and the domain's speed.

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use crate::constants::MILLIS_PER_HOUR;
use crate::models::{DomainType, Task};

/// Raised by a worker to fail a task. Recorded on the task, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskFailure {
    pub message: String,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait TaskWorker: Send + Sync + std::fmt::Debug {
    /// Report progress in `[0, ∞)`; `>= 1.0` completes the task
    async fn advance(&self, task: &Task, elapsed: Duration) -> Result<f64, TaskFailure>;
}

/// Time-based progress: `elapsed / (estimated × duration_multiplier(domain))`
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedWorker;

#[async_trait]
impl TaskWorker for SimulatedWorker {
    async fn advance(&self, task: &Task, elapsed: Duration) -> Result<f64, TaskFailure> {
        Ok(progress_fraction(
            task.domain,
            task.estimated_duration_hours,
            elapsed,
        ))
    }
}

pub fn progress_fraction(domain: DomainType, estimated_hours: f64, elapsed: Duration) -> f64 {
    let budget_hours = estimated_hours * domain.duration_multiplier();
    if !(budget_hours.is_finite() && budget_hours > 0.0) {
        return 1.0;
    }
    let elapsed_hours = elapsed.num_milliseconds().max(0) as f64 / MILLIS_PER_HOUR;
    elapsed_hours / budget_hours
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_estimate_completes_immediately() {
        assert_eq!(progress_fraction(DomainType::Api, 0.0, Duration::zero()), 1.0);
    }

    #[test]
    fn test_database_runs_at_nominal_speed() {
        let p = progress_fraction(DomainType::Database, 2.0, Duration::hours(1));
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_testing_finishes_before_research() {
        let elapsed = Duration::hours(10);
        let testing = progress_fraction(DomainType::Testing, 10.0, elapsed);
        let research = progress_fraction(DomainType::Research, 10.0, elapsed);
        assert!(testing >= 1.0);
        assert!(research < 1.0);
        assert!((research - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_negative_elapsed_is_clamped() {
        assert_eq!(progress_fraction(DomainType::Ui, 5.0, Duration::hours(-3)), 0.0);
    }
}
