//! Component-specific recovery. A handler either brings the component back or returns a
//! [`RecoveryError`], which the monitor turns into an escalation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::probes::metric_keys;
use crate::constants::events;
use crate::models::{Component, HealthCheckResult};
use crate::store::{record_event, SharedStore, StoreError};

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Store recovery failed: {0}")]
    Store(#[from] StoreError),

    #[error("Restart request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Restart endpoint returned status {0}")]
    Status(u16),

    #[error("No workflow id reported by the probe")]
    MissingWorkflowId,

    #[error("Recovery failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait RecoveryHandler: Send + Sync + std::fmt::Debug {
    async fn recover(&self, result: &HealthCheckResult) -> Result<(), RecoveryError>;
}

/// Reconnect the store, then drop idle connections
#[derive(Debug)]
pub struct DatabaseRecovery {
    store: SharedStore,
}

impl DatabaseRecovery {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecoveryHandler for DatabaseRecovery {
    async fn recover(&self, _result: &HealthCheckResult) -> Result<(), RecoveryError> {
        self.store.reconnect().await?;
        let cleaned = self.store.clean_idle_connections().await?;
        info!(cleaned_connections = cleaned, "Database connection recovered");
        Ok(())
    }
}

async fn post_restart(client: &reqwest::Client, url: &str) -> Result<(), RecoveryError> {
    let response = client.post(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(RecoveryError::Status(status.as_u16()));
    }
    Ok(())
}

/// Asks an external supervisor to restart the API
#[derive(Debug)]
pub struct ApiRestartRecovery {
    client: reqwest::Client,
    restart_url: String,
}

impl ApiRestartRecovery {
    pub fn new(client: reqwest::Client, restart_url: impl Into<String>) -> Self {
        Self {
            client,
            restart_url: restart_url.into(),
        }
    }
}

#[async_trait]
impl RecoveryHandler for ApiRestartRecovery {
    async fn recover(&self, _result: &HealthCheckResult) -> Result<(), RecoveryError> {
        post_restart(&self.client, &self.restart_url).await?;
        info!(url = %self.restart_url, "API restart requested");
        Ok(())
    }
}

/// Restarts the workflow named in the probe metrics
#[derive(Debug)]
pub struct WorkflowRestartRecovery {
    client: reqwest::Client,
    base_url: String,
}

impl WorkflowRestartRecovery {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RecoveryHandler for WorkflowRestartRecovery {
    async fn recover(&self, result: &HealthCheckResult) -> Result<(), RecoveryError> {
        let workflow_id = result
            .metric_str(metric_keys::WORKFLOW_ID)
            .ok_or(RecoveryError::MissingWorkflowId)?;
        let url = format!(
            "{}/workflows/{}/restart",
            self.base_url.trim_end_matches('/'),
            workflow_id
        );
        post_restart(&self.client, &url).await?;
        info!(workflow_id = %workflow_id, "Workflow restart requested");
        Ok(())
    }
}

#[async_trait]
pub trait ResourceHooks: Send + Sync + std::fmt::Debug {
    async fn reduce_memory(&self) -> Result<(), RecoveryError>;

    async fn reduce_cpu(&self) -> Result<(), RecoveryError>;
}

/// Default hooks: record the request so an operator-side agent can act on it
#[derive(Debug)]
pub struct EventResourceHooks {
    store: SharedStore,
}

impl EventResourceHooks {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResourceHooks for EventResourceHooks {
    async fn reduce_memory(&self) -> Result<(), RecoveryError> {
        record_event(
            self.store.as_ref(),
            events::RESOURCE_REDUCTION,
            "memory reduction requested",
        )
        .await;
        Ok(())
    }

    async fn reduce_cpu(&self) -> Result<(), RecoveryError> {
        record_event(
            self.store.as_ref(),
            events::RESOURCE_REDUCTION,
            "cpu reduction requested",
        )
        .await;
        Ok(())
    }
}

/// Calls the hooks matching the pressure flags; both when the probe reported neither
#[derive(Debug)]
pub struct PerformanceRecovery {
    hooks: Arc<dyn ResourceHooks>,
}

impl PerformanceRecovery {
    pub fn new(hooks: Arc<dyn ResourceHooks>) -> Self {
        Self { hooks }
    }
}

fn flag(result: &HealthCheckResult, key: &str) -> bool {
    result
        .metrics
        .as_ref()
        .and_then(|m| m.get(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

#[async_trait]
impl RecoveryHandler for PerformanceRecovery {
    async fn recover(&self, result: &HealthCheckResult) -> Result<(), RecoveryError> {
        let memory = flag(result, metric_keys::MEMORY_PRESSURE);
        let cpu = flag(result, metric_keys::CPU_PRESSURE);
        let unknown = !memory && !cpu;

        if memory || unknown {
            self.hooks.reduce_memory().await?;
        }
        if cpu || unknown {
            self.hooks.reduce_cpu().await?;
        }
        Ok(())
    }
}

/// Recovery handlers keyed by component
#[derive(Debug, Clone, Default)]
pub struct RecoveryRegistry {
    handlers: HashMap<Component, Arc<dyn RecoveryHandler>>,
}

impl RecoveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: Component, handler: Arc<dyn RecoveryHandler>) {
        self.handlers.insert(component, handler);
    }

    pub fn get(&self, component: &Component) -> Option<Arc<dyn RecoveryHandler>> {
        self.handlers.get(component).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;

    use super::*;
    use crate::store::InMemoryStore;

    #[derive(Debug, Default)]
    struct CountingHooks {
        memory: AtomicU32,
        cpu: AtomicU32,
    }

    #[async_trait]
    impl ResourceHooks for CountingHooks {
        async fn reduce_memory(&self) -> Result<(), RecoveryError> {
            self.memory.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn reduce_cpu(&self) -> Result<(), RecoveryError> {
            self.cpu.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn unhealthy(component: Component, metrics: Option<BTreeMap<String, serde_json::Value>>) -> HealthCheckResult {
        HealthCheckResult {
            component,
            healthy: false,
            response_time_ms: 50,
            error: Some("down".to_string()),
            timestamp: Utc::now(),
            metrics,
        }
    }

    #[tokio::test]
    async fn test_performance_recovery_follows_pressure_flags() {
        let hooks = Arc::new(CountingHooks::default());
        let recovery = PerformanceRecovery::new(hooks.clone());

        let mut metrics = BTreeMap::new();
        metrics.insert(metric_keys::CPU_PRESSURE.to_string(), true.into());
        metrics.insert(metric_keys::MEMORY_PRESSURE.to_string(), false.into());
        recovery
            .recover(&unhealthy(Component::Performance, Some(metrics)))
            .await
            .unwrap();
        assert_eq!(hooks.cpu.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.memory.load(Ordering::SeqCst), 0);

        recovery
            .recover(&unhealthy(Component::Performance, None))
            .await
            .unwrap();
        assert_eq!(hooks.cpu.load(Ordering::SeqCst), 2);
        assert_eq!(hooks.memory.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_workflow_recovery_needs_workflow_id() {
        let recovery = WorkflowRestartRecovery::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = recovery
            .recover(&unhealthy(Component::Workflow, None))
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::MissingWorkflowId));
    }

    #[tokio::test]
    async fn test_database_recovery_reconnects() {
        let store = Arc::new(InMemoryStore::new());
        let recovery = DatabaseRecovery::new(store.clone());
        recovery
            .recover(&unhealthy(Component::Database, None))
            .await
            .unwrap();
        assert_eq!(store.reconnects(), 1);

        store.set_available(false);
        assert!(recovery
            .recover(&unhealthy(Component::Database, None))
            .await
            .is_err());
    }
}
