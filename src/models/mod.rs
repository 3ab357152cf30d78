//! # Data Models
//!
//! Plain data types shared across the orchestration core. Rows written to the durable
//! store are serialized straight from these types (snake_case field names).

pub mod agent;
pub mod decision;
pub mod health;
pub mod portal;
pub mod records;
pub mod task;

pub use agent::{AgentState, AgentStatus};
pub use decision::{
    AnalyticsPayload, CustomerServicePayload, DecisionInput, DecisionPayload, DecisionRecord,
    DecisionResult, DecisionType, EstimatedImpact, FinancialPayload, ShipmentPayload,
};
pub use health::{Component, HealthCheckResult, Severity};
pub use portal::{PortalPerformance, PortalStatus};
pub use records::{Escalation, Issue, IssueStatus, SystemEvent, SystemMetrics};
pub use task::{DomainType, NewTask, Priority, Task, TaskId, TaskRequirements};
