use super::errors::{StateMachineError, StateMachineResult};
use super::events::TaskEvent;
use super::states::TaskState;

/// Legal `(from, to)` pairs. Anything not listed here is rejected.
pub const ALLOWED_TRANSITIONS: &[(TaskState, TaskState)] = &[
    (TaskState::Pending, TaskState::InProgress),
    (TaskState::InProgress, TaskState::Completed),
    (TaskState::InProgress, TaskState::Failed),
];

/// Transition table for the task lifecycle
///
/// Stateless: the current state lives on the task itself, the machine only decides
/// where an event leads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Determine the target state for an event, rejecting illegal combinations
    pub fn determine_target_state(
        current_state: TaskState,
        event: &TaskEvent,
    ) -> StateMachineResult<TaskState> {
        use TaskState::*;

        let target = match (current_state, event) {
            (Pending, TaskEvent::Start) => InProgress,
            (InProgress, TaskEvent::Complete) => Completed,
            (InProgress, TaskEvent::Fail(_)) => Failed,
            (from, event) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        debug_assert!(Self::is_allowed(current_state, target));
        Ok(target)
    }

    /// Whether the pair appears in the transition table
    pub fn is_allowed(from: TaskState, to: TaskState) -> bool {
        ALLOWED_TRANSITIONS.contains(&(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert_eq!(
            TaskStateMachine::determine_target_state(TaskState::Pending, &TaskEvent::Start),
            Ok(TaskState::InProgress)
        );
        assert_eq!(
            TaskStateMachine::determine_target_state(TaskState::InProgress, &TaskEvent::Complete),
            Ok(TaskState::Completed)
        );
        assert_eq!(
            TaskStateMachine::determine_target_state(
                TaskState::InProgress,
                &TaskEvent::Fail("boom".to_string())
            ),
            Ok(TaskState::Failed)
        );
    }

    #[test]
    fn test_skipping_in_progress_is_rejected() {
        let err = TaskStateMachine::determine_target_state(TaskState::Pending, &TaskEvent::Complete)
            .unwrap_err();
        assert_eq!(
            err,
            StateMachineError::InvalidTransition {
                from: "pending".to_string(),
                event: "complete".to_string(),
            }
        );
    }

    #[test]
    fn test_terminal_states_reject_every_event() {
        let events = [
            TaskEvent::Start,
            TaskEvent::Complete,
            TaskEvent::Fail("again".to_string()),
        ];
        for state in [TaskState::Completed, TaskState::Failed] {
            for event in &events {
                assert!(TaskStateMachine::determine_target_state(state, event).is_err());
            }
        }
    }

    #[test]
    fn test_failed_has_no_retry_edge() {
        assert!(!TaskStateMachine::is_allowed(TaskState::Failed, TaskState::Pending));
        assert!(!TaskStateMachine::is_allowed(TaskState::Failed, TaskState::InProgress));
    }
}
