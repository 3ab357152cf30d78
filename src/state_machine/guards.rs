use std::collections::HashMap;

use super::errors::{capacity_exhausted, dependencies_not_met, StateMachineResult};
use crate::models::{Task, TaskId};

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if a transition is allowed
    fn check(&self, entity: &T) -> StateMachineResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard requiring every dependency of a task to be completed before it starts
#[derive(Debug)]
pub struct DependenciesCompleteGuard<'a> {
    board: &'a HashMap<TaskId, Task>,
}

impl<'a> DependenciesCompleteGuard<'a> {
    pub fn new(board: &'a HashMap<TaskId, Task>) -> Self {
        Self { board }
    }
}

impl StateGuard<Task> for DependenciesCompleteGuard<'_> {
    fn check(&self, task: &Task) -> StateMachineResult<()> {
        let unmet: Vec<String> = task
            .dependencies
            .iter()
            .filter(|dep| {
                !self
                    .board
                    .get(dep)
                    .is_some_and(|t| t.status.satisfies_dependencies())
            })
            .map(|dep| dep.to_string())
            .collect();

        if unmet.is_empty() {
            Ok(())
        } else {
            Err(dependencies_not_met(format!(
                "task {} waits on {}",
                task.id,
                unmet.join(", ")
            )))
        }
    }

    fn description(&self) -> &'static str {
        "All dependencies must be completed"
    }
}

/// Guard keeping the in-flight set within `max_concurrent_tasks`
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyGuard {
    pub in_flight: usize,
    pub max_concurrent: usize,
}

impl StateGuard<Task> for ConcurrencyGuard {
    fn check(&self, _task: &Task) -> StateMachineResult<()> {
        if self.in_flight < self.max_concurrent {
            Ok(())
        } else {
            Err(capacity_exhausted(self.in_flight, self.max_concurrent))
        }
    }

    fn description(&self) -> &'static str {
        "In-flight tasks must stay under the concurrency limit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DomainType, NewTask, Priority};
    use crate::state_machine::TaskState;
    use chrono::Utc;

    fn task(seq: u64, deps: Vec<TaskId>) -> Task {
        let new = NewTask::new(DomainType::Backend, Priority::Medium, "t").with_dependencies(deps);
        Task::from_new(new, Utc::now(), seq)
    }

    #[test]
    fn test_dependencies_guard_blocks_until_completed() {
        let a = task(0, vec![]);
        let b = task(1, vec![a.id]);
        let mut board = HashMap::new();
        board.insert(a.id, a.clone());
        board.insert(b.id, b.clone());

        assert!(DependenciesCompleteGuard::new(&board).check(&b).is_err());

        board.get_mut(&a.id).unwrap().status = TaskState::Failed;
        assert!(DependenciesCompleteGuard::new(&board).check(&b).is_err());

        board.get_mut(&a.id).unwrap().status = TaskState::Completed;
        assert!(DependenciesCompleteGuard::new(&board).check(&b).is_ok());
    }

    #[test]
    fn test_concurrency_guard() {
        let t = task(0, vec![]);
        let open = ConcurrencyGuard { in_flight: 1, max_concurrent: 2 };
        let full = ConcurrencyGuard { in_flight: 2, max_concurrent: 2 };
        assert!(open.check(&t).is_ok());
        assert!(full.check(&t).is_err());
    }
}
