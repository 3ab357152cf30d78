#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # TMS Autonomy Core
//!
//! Autonomous orchestration core for a transportation-management system: a
//! dependency-aware development task scheduler, a scoring engine for operational
//! decisions, a multi-probe health monitor with automated recovery and an SLO guard with a
//! global emergency stop.
//!
//! ## Architecture
//!
//! Four periodic loops (task, health, portal, SLO) run against state owned by their
//! components. The decision engine is called directly by the embedding application.
//! Everything durable goes through the narrow [`store::DurableStore`] contract.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Task orchestrator, agents and the autonomous system lifecycle
//! - [`decision`] - Candidate scoring for shipment, customer service, financial and
//!   analytics decisions
//! - [`health`] - Probes, recovery handlers and the health monitor
//! - [`slo`] - Portal monitoring, SLO aggregation, mitigation and the kill switch
//! - [`state_machine`] - Task lifecycle states, events and guards
//! - [`store`] - Durable store contract with in-memory and PostgreSQL implementations
//! - [`notifications`] - Alert fan-out to email, chat and webhook sinks
//! - [`config`] - Layered configuration
//! - [`models`] - Shared data types
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tms_autonomy::config::AutonomyConfig;
//! use tms_autonomy::models::{DomainType, NewTask, Priority};
//! use tms_autonomy::orchestration::SystemBuilder;
//!
//! # async fn example() -> tms_autonomy::Result<()> {
//! let system = SystemBuilder::new(AutonomyConfig::default()).build().await?;
//! system.start().await?;
//!
//! let schema = system
//!     .orchestrator()
//!     .enqueue(NewTask::new(DomainType::Database, Priority::Critical, "Design shipment schema"))
//!     .await?;
//! println!("queued {schema}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod decision;
pub mod error;
pub mod health;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod orchestration;
pub mod slo;
pub mod state_machine;
pub mod store;

pub use config::{AutonomyConfig, ConfigManager};
pub use decision::DecisionEngine;
pub use error::{AutonomyError, Result};
pub use health::HealthMonitor;
pub use models::{
    DecisionInput, DecisionPayload, DecisionResult, DomainType, HealthCheckResult, NewTask,
    Priority, Severity, Task, TaskId,
};
pub use orchestration::{AutonomousSystem, SystemBuilder, TaskOrchestrator};
pub use slo::{KillSwitch, SloGuard};
pub use state_machine::TaskState;
pub use store::{DurableStore, InMemoryStore, SharedStore};
