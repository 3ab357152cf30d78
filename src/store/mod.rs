//! # Durable Store
//!
//! The narrow persistence contract the orchestration core talks to. Every write is an
//! append or an upsert; the only value the core ever reads back is the emergency-stop
//! flag.
//!
//! Implementations:
//! - [`InMemoryStore`]: embedded use and tests
//! - [`PgDurableStore`]: PostgreSQL via sqlx (feature `postgres`)

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    DecisionRecord, Escalation, HealthCheckResult, Issue, SystemEvent, SystemMetrics, Task,
};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgDurableStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed on {table}: {reason}")]
    Query { table: &'static str, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(err.to_string())
            }
            other => Self::Query {
                table: "unknown",
                reason: other.to_string(),
            },
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DurableStore: Send + Sync + std::fmt::Debug {
    async fn upsert_task(&self, task: &Task) -> StoreResult<()>;

    async fn insert_decision(&self, record: &DecisionRecord) -> StoreResult<()>;

    async fn insert_health_checks(&self, results: &[HealthCheckResult]) -> StoreResult<()>;

    async fn insert_issue(&self, issue: &Issue) -> StoreResult<()>;

    async fn insert_escalation(&self, escalation: &Escalation) -> StoreResult<()>;

    async fn insert_system_metrics(&self, metrics: &SystemMetrics) -> StoreResult<()>;

    async fn insert_system_event(&self, event: &SystemEvent) -> StoreResult<()>;

    /// `None` when the flag has never been written
    async fn get_flag(&self, key: &str, scope: &str) -> StoreResult<Option<bool>>;

    async fn set_flag(&self, key: &str, scope: &str, value: bool) -> StoreResult<()>;

    /// Cheap liveness query used by the database health probe
    async fn ping(&self) -> StoreResult<()>;

    /// Re-establish connectivity after a failed probe
    async fn reconnect(&self) -> StoreResult<()> {
        self.ping().await
    }

    /// Drop idle server-side connections; returns how many were closed
    async fn clean_idle_connections(&self) -> StoreResult<u64> {
        Ok(0)
    }
}

pub type SharedStore = Arc<dyn DurableStore>;

/// Record a system event, logging rather than failing when the store rejects it
pub async fn record_event(store: &dyn DurableStore, event_type: &str, message: impl Into<String>) {
    let event = SystemEvent::new(event_type, message);
    if let Err(e) = store.insert_system_event(&event).await {
        tracing::warn!(event_type = %event_type, error = %e, "Failed to record system event");
    }
}
