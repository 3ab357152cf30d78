//! Aggregate development metrics recomputed after every task tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Task;
use crate::state_machine::TaskState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentMetrics {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub in_progress_tasks: u64,
    pub average_task_duration_hours: f64,
    pub code_quality: f64,
    pub test_coverage: f64,
    pub deployment_success: f64,
    pub security_score: f64,
    pub last_deployment: Option<DateTime<Utc>>,
    pub active_agents: Vec<String>,
}

impl Default for DevelopmentMetrics {
    fn default() -> Self {
        Self {
            total_tasks: 0,
            completed_tasks: 0,
            failed_tasks: 0,
            in_progress_tasks: 0,
            average_task_duration_hours: 0.0,
            code_quality: code_quality(0),
            test_coverage: test_coverage(0),
            deployment_success: deployment_success(0, 0),
            security_score: security_score(0),
            last_deployment: None,
            active_agents: Vec::new(),
        }
    }
}

impl DevelopmentMetrics {
    /// Recount everything from the board; `total_tasks` and `last_deployment` are kept
    pub fn recompute<'a>(&mut self, tasks: impl IntoIterator<Item = &'a Task>) {
        let mut completed = 0u64;
        let mut failed = 0u64;
        let mut in_progress = 0u64;
        let mut duration_sum = 0.0;
        let mut duration_count = 0u64;

        for task in tasks {
            match task.status {
                TaskState::Completed => {
                    completed += 1;
                    if let Some(hours) = task.actual_duration_hours {
                        duration_sum += hours;
                        duration_count += 1;
                    }
                }
                TaskState::Failed => failed += 1,
                TaskState::InProgress => in_progress += 1,
                TaskState::Pending => {}
            }
        }

        self.completed_tasks = completed;
        self.failed_tasks = failed;
        self.in_progress_tasks = in_progress;
        self.average_task_duration_hours = if duration_count == 0 {
            0.0
        } else {
            duration_sum / duration_count as f64
        };
        self.code_quality = code_quality(completed);
        self.test_coverage = test_coverage(completed);
        self.deployment_success = deployment_success(completed, failed);
        self.security_score = security_score(completed);
    }
}

pub fn code_quality(completed: u64) -> f64 {
    (0.7 + completed as f64 / 100.0 * 0.25).min(0.95)
}

pub fn test_coverage(completed: u64) -> f64 {
    (0.6 + completed as f64 / 50.0 * 0.38).min(0.98)
}

pub fn deployment_success(completed: u64, failed: u64) -> f64 {
    if failed == 0 {
        1.0
    } else {
        completed as f64 / (completed + failed) as f64
    }
}

pub fn security_score(completed: u64) -> f64 {
    (0.8 + completed as f64 / 200.0 * 0.19).min(0.99)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothed_signals() {
        assert!((code_quality(0) - 0.7).abs() < 1e-9);
        assert!((code_quality(40) - 0.8).abs() < 1e-9);
        assert!((code_quality(1000) - 0.95).abs() < 1e-9);
        assert!((test_coverage(50) - 0.98).abs() < 1e-9);
        assert!((security_score(200) - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_deployment_success() {
        assert_eq!(deployment_success(0, 0), 1.0);
        assert_eq!(deployment_success(3, 1), 0.75);
        assert_eq!(deployment_success(0, 2), 0.0);
    }
}
