//! # Autonomy Bootstrap
//!
//! Builds an [`AutonomousSystem`] from configuration: durable store, notification sinks,
//! the standard probe set with its recovery handlers, portal probing and mitigation.
//! Every collaborator can be replaced before `build()`, which is how embedding
//! applications and tests inject their own.

use std::sync::Arc;

use tracing::{info, warn};

use super::autonomous_system::AutonomousSystem;
use super::task_orchestrator::TaskOrchestrator;
use super::worker::{SimulatedWorker, TaskWorker};
use crate::config::{AutonomyConfig, ConfigManager, StoreConfig};
use crate::decision::DecisionEngine;
use crate::error::{AutonomyError, Result};
use crate::health::{
    ApiRestartRecovery, DatabaseProbe, DatabaseRecovery, EventResourceHooks, HealthMonitor,
    HealthProbe, HttpApiProbe, PerformanceProbe, PerformanceRecovery, RecoveryHandler,
    ResourceHooks, WorkflowProbe, WorkflowRestartRecovery,
};
use crate::models::Component;
use crate::notifications::Notifier;
use crate::slo::{HttpPortalProbe, MitigationHooks, PortalProbe, SloGuard, StoreMitigationHooks};
use crate::store::{InMemoryStore, SharedStore};

/// Open the configured durable store. Without a database URL the in-memory store is used.
pub async fn connect_store(config: &StoreConfig) -> Result<SharedStore> {
    match config.database_url.as_deref() {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let store = crate::store::PgDurableStore::connect(url, config.max_connections).await?;
            if config.bootstrap_schema {
                store.bootstrap_schema().await?;
            }
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => Err(AutonomyError::Validation(
            "store.database_url is set but the postgres feature is disabled".to_string(),
        )),
        None => {
            info!("No database URL configured, using in-memory store");
            Ok(Arc::new(InMemoryStore::with_retention(config.memory_retention)))
        }
    }
}

#[derive(Debug)]
pub struct SystemBuilder {
    config: AutonomyConfig,
    store: Option<SharedStore>,
    worker: Option<Arc<dyn TaskWorker>>,
    notifier: Option<Notifier>,
    standard_probes: bool,
    probes: Vec<Arc<dyn HealthProbe>>,
    recovery: Vec<(Component, Arc<dyn RecoveryHandler>)>,
    resource_hooks: Option<Arc<dyn ResourceHooks>>,
    portal_probe: Option<Arc<dyn PortalProbe>>,
    mitigation: Option<Arc<dyn MitigationHooks>>,
}

impl SystemBuilder {
    pub fn new(config: AutonomyConfig) -> Self {
        Self {
            config,
            store: None,
            worker: None,
            notifier: None,
            standard_probes: true,
            probes: Vec::new(),
            recovery: Vec::new(),
            resource_hooks: None,
            portal_probe: None,
            mitigation: None,
        }
    }

    pub fn with_store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_worker(mut self, worker: Arc<dyn TaskWorker>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Skip the database / performance / API / workflow probes built from configuration
    pub fn without_standard_probes(mut self) -> Self {
        self.standard_probes = false;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Registered after the standard handlers, so it replaces them for the component
    pub fn with_recovery(mut self, component: Component, handler: Arc<dyn RecoveryHandler>) -> Self {
        self.recovery.push((component, handler));
        self
    }

    pub fn with_resource_hooks(mut self, hooks: Arc<dyn ResourceHooks>) -> Self {
        self.resource_hooks = Some(hooks);
        self
    }

    pub fn with_portal_probe(mut self, probe: Arc<dyn PortalProbe>) -> Self {
        self.portal_probe = Some(probe);
        self
    }

    pub fn with_mitigation(mut self, hooks: Arc<dyn MitigationHooks>) -> Self {
        self.mitigation = Some(hooks);
        self
    }

    pub async fn build(self) -> Result<AutonomousSystem> {
        self.config.validate()?;
        let config = self.config;

        let store = match self.store {
            Some(store) => store,
            None => connect_store(&config.store).await?,
        };
        let notifier = match self.notifier {
            Some(notifier) => notifier,
            None => Notifier::from_config(&config.notifications)?,
        };
        let http = reqwest::Client::builder()
            .timeout(config.health.probe_timeout())
            .build()
            .map_err(|e| AutonomyError::Orchestration(format!("HTTP client: {e}")))?;

        let mut health = HealthMonitor::new(config.health.clone(), Arc::clone(&store), notifier);
        if self.standard_probes {
            let hooks = self
                .resource_hooks
                .unwrap_or_else(|| Arc::new(EventResourceHooks::new(Arc::clone(&store))) as Arc<dyn ResourceHooks>);
            health = health
                .with_probe(Arc::new(DatabaseProbe::new(Arc::clone(&store))))
                .with_recovery(Component::Database, Arc::new(DatabaseRecovery::new(Arc::clone(&store))))
                .with_probe(Arc::new(PerformanceProbe::new(
                    config.health.cpu_threshold_percent,
                    config.health.memory_threshold_percent,
                )))
                .with_recovery(Component::Performance, Arc::new(PerformanceRecovery::new(hooks)));

            if let Some(url) = &config.health.api_url {
                health = health.with_probe(Arc::new(HttpApiProbe::new(http.clone(), url.clone())));
            }
            if let Some(url) = &config.health.api_restart_url {
                health = health.with_recovery(
                    Component::Api,
                    Arc::new(ApiRestartRecovery::new(http.clone(), url.clone())),
                );
            }
            if let Some(url) = &config.health.workflow_url {
                health = health
                    .with_probe(Arc::new(WorkflowProbe::new(http.clone(), url.clone())))
                    .with_recovery(
                        Component::Workflow,
                        Arc::new(WorkflowRestartRecovery::new(http.clone(), url.clone())),
                    );
            }
        }
        for probe in self.probes {
            health = health.with_probe(probe);
        }
        for (component, handler) in self.recovery {
            health = health.with_recovery(component, handler);
        }
        if health.probe_count() == 0 {
            warn!("Health monitor has no probes");
        }

        let portal_probe = self.portal_probe.or_else(|| {
            config.slo.portal_base_url.as_ref().map(|base| {
                Arc::new(HttpPortalProbe::new(http.clone(), base.clone())) as Arc<dyn PortalProbe>
            })
        });
        let mitigation = self
            .mitigation
            .unwrap_or_else(|| Arc::new(StoreMitigationHooks::new(Arc::clone(&store))) as Arc<dyn MitigationHooks>);
        let slo = SloGuard::new(config.slo.clone(), portal_probe, mitigation);

        let worker = self
            .worker
            .unwrap_or_else(|| Arc::new(SimulatedWorker) as Arc<dyn TaskWorker>);
        let orchestrator = TaskOrchestrator::new(config.orchestrator.clone(), Arc::clone(&store), worker);
        let decisions = DecisionEngine::new(config.decision.clone(), Arc::clone(&store));

        info!(
            probes = health.probe_count(),
            portals = slo.portals().len(),
            "✅ BOOTSTRAP: Autonomous system assembled"
        );
        Ok(AutonomousSystem::from_parts(
            config,
            store,
            orchestrator,
            decisions,
            health,
            slo,
        ))
    }
}

/// Load configuration from the usual places and assemble the system (not started)
pub async fn bootstrap_from_config_manager(manager: &ConfigManager) -> Result<AutonomousSystem> {
    info!(
        environment = %manager.environment(),
        config_directory = %manager.config_directory().display(),
        "🚀 BOOTSTRAP: Building autonomous system"
    );
    SystemBuilder::new(manager.config().clone()).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DurableStore;

    #[tokio::test]
    async fn test_memory_store_without_database_url() {
        let store = connect_store(&StoreConfig {
            database_url: None,
            ..StoreConfig::default()
        })
        .await
        .unwrap();
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_builder_registers_standard_probes() {
        let mut config = AutonomyConfig::default();
        config.health.api_url = Some("http://127.0.0.1:9/health".to_string());
        config.notifications = Default::default();
        let system = SystemBuilder::new(config).build().await.unwrap();
        assert_eq!(system.health().probe_count(), 3);
        assert!(!system.is_running());
        assert_eq!(system.loops_scheduled(), 0);
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_config() {
        let mut config = AutonomyConfig::default();
        config.orchestrator.max_concurrent_tasks = 0;
        let err = SystemBuilder::new(config).build().await.unwrap_err();
        assert!(matches!(err, AutonomyError::Configuration(_)));
    }
}
