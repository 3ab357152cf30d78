//! # Autonomy Configuration
//!
//! Typed configuration for every component of the orchestration core. All sections
//! carry serde defaults, so an empty file (or no file at all) yields a working
//! configuration; files and environment variables only override.
//!
//! ## Sources, later wins
//!
//! 1. `config/autonomy.toml`
//! 2. `config/autonomy.{environment}.toml`
//! 3. `AUTONOMY__SECTION__KEY` environment variables
//!
//! ```rust,no_run
//! use tms_autonomy::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let max = manager.config().orchestrator.max_concurrent_tasks;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::models::DomainType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    pub orchestrator: OrchestratorConfig,
    pub health: HealthConfig,
    pub slo: SloConfig,
    pub decision: DecisionConfig,
    pub notifications: NotificationConfig,
    pub store: StoreConfig,
}

impl AutonomyConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.orchestrator.validate()?;
        self.health.validate()?;
        self.slo.validate()?;
        self.decision.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Per-domain enable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainToggles {
    pub research: bool,
    pub frontend: bool,
    pub backend: bool,
    pub database: bool,
    pub testing: bool,
    pub deployment: bool,
    pub ui: bool,
    pub portal: bool,
    pub api: bool,
    pub security: bool,
}

impl Default for DomainToggles {
    fn default() -> Self {
        Self {
            research: true,
            frontend: true,
            backend: true,
            database: true,
            testing: true,
            deployment: true,
            ui: true,
            portal: true,
            api: true,
            security: true,
        }
    }
}

impl DomainToggles {
    pub fn is_enabled(&self, domain: DomainType) -> bool {
        match domain {
            DomainType::Research => self.research,
            DomainType::Frontend => self.frontend,
            DomainType::Backend => self.backend,
            DomainType::Database => self.database,
            DomainType::Testing => self.testing,
            DomainType::Deployment => self.deployment,
            DomainType::Ui => self.ui,
            DomainType::Portal => self.portal,
            DomainType::Api => self.api,
            DomainType::Security => self.security,
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = DomainType> + '_ {
        DomainType::ALL.into_iter().filter(|d| self.is_enabled(*d))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub domains: DomainToggles,
    /// Period of the health and portal monitoring loops
    pub monitoring_interval_ms: u64,
    /// Period of the task loop
    pub task_tick_interval_ms: u64,
    pub max_concurrent_tasks: usize,
    pub auto_deploy: bool,
    pub quality_threshold: f64,
    /// Enqueue the standard build plan when the board is empty at start
    pub seed_initial_plan: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            domains: DomainToggles::default(),
            monitoring_interval_ms: 300_000,
            task_tick_interval_ms: 60_000,
            max_concurrent_tasks: 10,
            auto_deploy: true,
            quality_threshold: 0.8,
            seed_initial_plan: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn monitoring_interval(&self) -> Duration {
        Duration::from_millis(self.monitoring_interval_ms)
    }

    pub fn task_tick_interval(&self) -> Duration {
        Duration::from_millis(self.task_tick_interval_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent_tasks == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestrator.max_concurrent_tasks",
                self.max_concurrent_tasks,
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(ConfigurationError::invalid_value(
                "orchestrator.quality_threshold",
                self.quality_threshold,
                "must be within [0, 1]",
            ));
        }
        require_positive_interval("orchestrator.monitoring_interval_ms", self.monitoring_interval_ms)?;
        require_positive_interval("orchestrator.task_tick_interval_ms", self.task_tick_interval_ms)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub probe_timeout_ms: u64,
    /// Consecutive unhealthy runs before a component is escalated
    pub escalation_threshold: u32,
    /// Results kept for uptime / error-rate aggregation
    pub metrics_window: usize,
    pub api_url: Option<String>,
    pub api_restart_url: Option<String>,
    pub workflow_url: Option<String>,
    pub cpu_threshold_percent: f64,
    pub memory_threshold_percent: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 10_000,
            escalation_threshold: 3,
            metrics_window: 100,
            api_url: None,
            api_restart_url: None,
            workflow_url: None,
            cpu_threshold_percent: 90.0,
            memory_threshold_percent: 90.0,
        }
    }
}

impl HealthConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        require_positive_interval("health.probe_timeout_ms", self.probe_timeout_ms)?;
        if self.escalation_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.escalation_threshold",
                self.escalation_threshold,
                "must be at least 1",
            ));
        }
        if self.metrics_window == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.metrics_window",
                self.metrics_window,
                "must be at least 1",
            ));
        }
        require_percent("health.cpu_threshold_percent", self.cpu_threshold_percent)?;
        require_percent("health.memory_threshold_percent", self.memory_threshold_percent)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SloConfig {
    pub uptime_min_percent: f64,
    pub success_rate_min_percent: f64,
    pub p95_max_seconds: f64,
    pub check_interval_ms: u64,
    /// Base URL portals are probed under (`{base}/{portal}/health`)
    pub portal_base_url: Option<String>,
    pub portals: Vec<String>,
    /// Samples kept per portal for uptime
    pub availability_window: usize,
}

impl Default for SloConfig {
    fn default() -> Self {
        Self {
            uptime_min_percent: 99.95,
            success_rate_min_percent: 98.0,
            p95_max_seconds: 2.5,
            check_interval_ms: 60_000,
            portal_base_url: None,
            portals: default_portals(),
            availability_window: 100,
        }
    }
}

fn default_portals() -> Vec<String> {
    [
        "super-admin",
        "admin",
        "tms-admin",
        "onboarding",
        "broker",
        "shipper",
        "carrier",
        "driver",
        "owner-operator",
        "factoring",
        "load-board",
        "crm",
        "financials",
        "edi",
        "marketplace",
        "analytics",
        "autonomous",
        "workers",
        "rates",
        "directory",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl SloConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Highest tolerated per-portal error rate, in percent
    pub fn max_error_rate_percent(&self) -> f64 {
        100.0 - self.success_rate_min_percent
    }

    fn validate(&self) -> ConfigResult<()> {
        require_percent("slo.uptime_min_percent", self.uptime_min_percent)?;
        require_percent("slo.success_rate_min_percent", self.success_rate_min_percent)?;
        if !(self.p95_max_seconds.is_finite() && self.p95_max_seconds > 0.0) {
            return Err(ConfigurationError::invalid_value(
                "slo.p95_max_seconds",
                self.p95_max_seconds,
                "must be a positive number of seconds",
            ));
        }
        require_positive_interval("slo.check_interval_ms", self.check_interval_ms)?;
        if self.availability_window == 0 {
            return Err(ConfigurationError::invalid_value(
                "slo.availability_window",
                self.availability_window,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub history_capacity: usize,
    pub history_trim_to: usize,
    pub learning_window: usize,
    pub initial_learning_rate: f64,
    /// Per-type entries kept in the decision context
    pub context_history: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            history_trim_to: 500,
            learning_window: 100,
            initial_learning_rate: 0.1,
            context_history: 50,
        }
    }
}

impl DecisionConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.history_trim_to == 0 || self.history_trim_to >= self.history_capacity {
            return Err(ConfigurationError::Conflict(format!(
                "decision.history_trim_to ({}) must be non-zero and below decision.history_capacity ({})",
                self.history_trim_to, self.history_capacity
            )));
        }
        if self.learning_window == 0 {
            return Err(ConfigurationError::invalid_value(
                "decision.learning_window",
                self.learning_window,
                "must be at least 1",
            ));
        }
        if !(self.initial_learning_rate.is_finite() && self.initial_learning_rate > 0.0) {
            return Err(ConfigurationError::invalid_value(
                "decision.initial_learning_rate",
                self.initial_learning_rate,
                "must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSinkConfig {
    pub relay_url: String,
    pub from: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub email: Option<EmailSinkConfig>,
    pub chat_webhook_url: Option<String>,
    pub webhook_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email: None,
            chat_webhook_url: None,
            webhook_url: None,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// When unset the embedded in-memory store is used
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub bootstrap_schema: bool,
    /// Rows kept per append-only table by the in-memory store
    pub memory_retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            bootstrap_schema: true,
            memory_retention: 10_000,
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.memory_retention == 0 {
            return Err(ConfigurationError::invalid_value(
                "store.memory_retention",
                self.memory_retention,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn require_positive_interval(field: &str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        Err(ConfigurationError::invalid_value(field, value, "interval must be greater than zero"))
    } else {
        Ok(())
    }
}

fn require_percent(field: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(ConfigurationError::invalid_value(field, value, "must be a percentage in (0, 100]"))
    }
}
