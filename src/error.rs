//! # Error Types
//!
//! Crate-level error taxonomy. Each component owns a narrow error type
//! (`StoreError`, `StateMachineError`, `ConfigurationError`, ...) and converts into
//! [`AutonomyError`] at the component boundary, so control loops log one type.
//!
//! Note that several failure kinds never surface here at all: task failures are
//! recorded on the task, decision failures become a fallback decision, probe failures
//! become unhealthy results and recovery failures become escalations.

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigurationError;
use crate::decision::DecisionFailure;
use crate::health::{ProbeError, RecoveryError};
use crate::notifications::NotificationError;
use crate::orchestration::TaskFailure;
use crate::state_machine::StateMachineError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AutonomyError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("State transition error: {0}")]
    StateTransition(#[from] StateMachineError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),
    #[error("Recovery error: {0}")]
    Recovery(#[from] RecoveryError),
    #[error("Task failure: {0}")]
    Task(#[from] TaskFailure),
    #[error("Decision failure: {0}")]
    Decision(#[from] DecisionFailure),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),
    #[error("Emergency stop is active; resume() must be called to clear it")]
    EmergencyStopActive,
    #[error("Orchestration error: {0}")]
    Orchestration(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AutonomyError {
    /// Whether this error is the emergency-stop guard rather than a fault
    pub fn is_emergency_stop(&self) -> bool {
        matches!(self, Self::EmergencyStopActive)
    }
}

pub type Result<T> = std::result::Result<T, AutonomyError>;
