//! # Orchestration
//!
//! The task orchestrator and the autonomous system that drives it.
//!
//! ## Core Components
//!
//! - **TaskOrchestrator**: task board, dependency gating, bounded concurrency, quality gate
//!   and auto-deploy
//! - **AgentRoster**: one development agent per enabled domain
//! - **TaskWorker**: reports progress for in-flight tasks (`SimulatedWorker` by default)
//! - **AutonomousSystem**: start/stop/emergency-stop lifecycle and the periodic loops
//! - **SystemBuilder**: assembles a system from configuration

pub mod agents;
pub mod autonomous_system;
pub mod bootstrap;
pub mod metrics;
pub mod plan;
pub mod task_orchestrator;
pub mod worker;

pub use agents::{agent_profile, AgentRoster};
pub use autonomous_system::{AutonomousSystem, LoopKind, SystemStatus};
pub use bootstrap::{bootstrap_from_config_manager, connect_store, SystemBuilder};
pub use metrics::DevelopmentMetrics;
pub use plan::{standard_build_plan, PlannedTask};
pub use task_orchestrator::{TaskOrchestrator, TickReport};
pub use worker::{progress_fraction, SimulatedWorker, TaskFailure, TaskWorker};
