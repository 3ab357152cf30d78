//! # System Constants
//!
//! Durable-store table names, feature-flag keys, system event names and the fixed
//! severity bands shared by the orchestration core.

/// Feature flags read from the durable store
pub mod flags {
    /// Global emergency-stop switch ("big red button")
    pub const EMERGENCY_STOP_KEY: &str = "autonomy.emergencyStop";
    pub const GLOBAL_SCOPE: &str = "global";
}

/// Table names used by store implementations
pub mod tables {
    pub const TASKS: &str = "development_tasks";
    pub const DECISIONS: &str = "ai_decisions";
    pub const HEALTH_CHECKS: &str = "health_checks";
    pub const ISSUES: &str = "system_issues";
    pub const ESCALATIONS: &str = "human_escalations";
    pub const SYSTEM_METRICS: &str = "system_metrics";
    pub const SYSTEM_EVENTS: &str = "system_events";
    pub const FEATURE_FLAGS: &str = "feature_flags";
}

/// System event types written to the `system_events` table
pub mod events {
    pub const SYSTEM_STARTED: &str = "system_started";
    pub const SYSTEM_START_BLOCKED: &str = "system_start_blocked";
    pub const SYSTEM_STOPPED: &str = "system_stopped";
    pub const EMERGENCY_STOP_TRIGGERED: &str = "emergency_stop_triggered";
    pub const EMERGENCY_STOP_CLEARED: &str = "emergency_stop_cleared";
    pub const REMOTE_STOP_DETECTED: &str = "remote_emergency_stop_detected";
    pub const TASK_LOOP_ERROR: &str = "development_loop_error";
    pub const HEALTH_LOOP_ERROR: &str = "health_loop_error";
    pub const PORTAL_LOOP_ERROR: &str = "portal_monitor_error";
    pub const SLO_LOOP_ERROR: &str = "slo_monitoring_failed";
    pub const QUALITY_GATE_TRIGGERED: &str = "quality_gate_triggered";
    pub const AUTO_DEPLOY_TRIGGERED: &str = "auto_deploy_triggered";
    pub const PORTAL_THROTTLED: &str = "portal_throttled";
    pub const SLO_BREACH: &str = "slo_breach";
    pub const ROLLBACK_TRIGGERED: &str = "rollback_triggered";
    pub const RESOURCE_REDUCTION: &str = "resource_reduction_requested";
}

/// Response-time bands (milliseconds) for health severity classification
pub mod severity_bands {
    pub const CRITICAL_ABOVE_MS: u64 = 10_000;
    pub const HIGH_ABOVE_MS: u64 = 5_000;
    pub const MEDIUM_ABOVE_MS: u64 = 2_000;
}

/// Action identifier used for every fallback and escalation decision
pub const ESCALATE_TO_HUMAN: &str = "escalate_to_human";

/// Milliseconds per hour, used for task duration arithmetic
pub const MILLIS_PER_HOUR: f64 = 3_600_000.0;
