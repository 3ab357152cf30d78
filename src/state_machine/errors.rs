use thiserror::Error;

/// Error types for task state machine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },

    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;

/// Helper to build a guard failure for unmet dependencies
pub fn dependencies_not_met(reason: impl Into<String>) -> StateMachineError {
    StateMachineError::GuardFailed {
        reason: format!("Dependencies not satisfied: {}", reason.into()),
    }
}

/// Helper to build a guard failure for an exhausted concurrency budget
pub fn capacity_exhausted(in_flight: usize, max: usize) -> StateMachineError {
    StateMachineError::GuardFailed {
        reason: format!("Concurrency limit reached: {in_flight}/{max} tasks in flight"),
    }
}
