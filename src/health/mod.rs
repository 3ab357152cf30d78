//! # Health Monitoring
//!
//! Independent component probes run concurrently under a per-probe timeout. Unhealthy
//! results raise alerts, trigger component-specific recovery and, when recovery fails or
//! keeps failing, an escalation to human operators.

pub mod monitor;
pub mod probes;
pub mod recovery;

pub use monitor::{aggregate_metrics, HealthMonitor};
pub use probes::{
    assess_pressure, metric_keys, DatabaseProbe, HealthProbe, HttpApiProbe, PerformanceProbe,
    ProbeError, ProbeOutcome, WorkflowProbe,
};
pub use recovery::{
    ApiRestartRecovery, DatabaseRecovery, EventResourceHooks, PerformanceRecovery,
    RecoveryError, RecoveryHandler, RecoveryRegistry, ResourceHooks, WorkflowRestartRecovery,
};
