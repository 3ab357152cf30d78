//! PostgreSQL-backed durable store.
//!
//! Payload columns (`requirements`, `output`, `metadata`, `metrics`) are JSONB. The
//! schema is bundled with the crate and applied by [`PgDurableStore::bootstrap_schema`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::{info, warn};
use uuid::Uuid;

use super::{DurableStore, StoreError, StoreResult};
use crate::constants::tables;
use crate::models::{
    DecisionRecord, Escalation, HealthCheckResult, Issue, SystemEvent, SystemMetrics, Task,
};

const SCHEMA: &str = include_str!("../../migrations/20260101000000_autonomy_core.sql");

#[derive(Debug, Clone)]
pub struct PgDurableStore {
    pool: PgPool,
}

fn query_error(table: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| StoreError::Query {
        table,
        reason: e.to_string(),
    }
}

impl PgDurableStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!(max_connections = max_connections, "Connected durable store pool");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create any missing tables and indexes
    pub async fn bootstrap_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Durable store schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl DurableStore for PgDurableStore {
    async fn upsert_task(&self, task: &Task) -> StoreResult<()> {
        let dependencies: Vec<Uuid> = task.dependencies.iter().copied().collect();
        sqlx::query(
            r#"
            INSERT INTO development_tasks (
                id, domain, priority, status, description, requirements, assigned_agent,
                created_at, updated_at, started_at, estimated_duration_hours,
                actual_duration_hours, dependencies, output, errors
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                assigned_agent = EXCLUDED.assigned_agent,
                updated_at = EXCLUDED.updated_at,
                started_at = EXCLUDED.started_at,
                actual_duration_hours = EXCLUDED.actual_duration_hours,
                output = EXCLUDED.output,
                errors = EXCLUDED.errors
            "#,
        )
        .bind(task.id)
        .bind(task.domain.as_str())
        .bind(task.priority.as_str())
        .bind(task.status.to_string())
        .bind(&task.description)
        .bind(Json(&task.requirements))
        .bind(&task.assigned_agent)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.started_at)
        .bind(task.estimated_duration_hours)
        .bind(task.actual_duration_hours)
        .bind(dependencies)
        .bind(task.output.as_ref().map(Json))
        .bind(task.errors.clone())
        .execute(&self.pool)
        .await
        .map_err(query_error(tables::TASKS))?;
        Ok(())
    }

    async fn insert_decision(&self, record: &DecisionRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ai_decisions (
                id, decision_type, priority, action, confidence, reasoning,
                estimated_impact, requires_human_review, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(record.decision_type.as_str())
        .bind(record.priority.as_str())
        .bind(&record.action)
        .bind(record.confidence)
        .bind(&record.reasoning)
        .bind(record.estimated_impact.as_str())
        .bind(record.requires_human_review)
        .bind(record.metadata.as_ref().map(Json))
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(query_error(tables::DECISIONS))?;
        Ok(())
    }

    async fn insert_health_checks(&self, results: &[HealthCheckResult]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for result in results {
            sqlx::query(
                r#"
                INSERT INTO health_checks (component, healthy, response_time_ms, error, metrics, checked_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(result.component.as_str())
            .bind(result.healthy)
            .bind(result.response_time_ms as i64)
            .bind(&result.error)
            .bind(result.metrics.as_ref().map(Json))
            .bind(result.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(query_error(tables::HEALTH_CHECKS))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_issue(&self, issue: &Issue) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_issues (id, component, severity, error, response_time_ms, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(issue.id)
        .bind(issue.component.as_str())
        .bind(issue.severity.as_str())
        .bind(&issue.error)
        .bind(issue.response_time_ms as i64)
        .bind(issue.status.as_str())
        .bind(issue.timestamp)
        .execute(&self.pool)
        .await
        .map_err(query_error(tables::ISSUES))?;
        Ok(())
    }

    async fn insert_escalation(&self, escalation: &Escalation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO human_escalations (id, component, severity, original_error, recovery_error, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(escalation.id)
        .bind(escalation.component.as_str())
        .bind(escalation.severity.as_str())
        .bind(&escalation.original_error)
        .bind(&escalation.recovery_error)
        .bind(&escalation.reason)
        .bind(escalation.timestamp)
        .execute(&self.pool)
        .await
        .map_err(query_error(tables::ESCALATIONS))?;
        Ok(())
    }

    async fn insert_system_metrics(&self, metrics: &SystemMetrics) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_metrics (
                uptime_percent, avg_response_time_ms, error_rate_percent,
                cpu_usage_percent, memory_usage_percent, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(metrics.uptime_percent)
        .bind(metrics.avg_response_time_ms)
        .bind(metrics.error_rate_percent)
        .bind(metrics.cpu_usage_percent)
        .bind(metrics.memory_usage_percent)
        .bind(metrics.timestamp)
        .execute(&self.pool)
        .await
        .map_err(query_error(tables::SYSTEM_METRICS))?;
        Ok(())
    }

    async fn insert_system_event(&self, event: &SystemEvent) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO system_events (event_type, message, created_at) VALUES ($1, $2, $3)",
        )
        .bind(&event.event_type)
        .bind(&event.message)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await
        .map_err(query_error(tables::SYSTEM_EVENTS))?;
        Ok(())
    }

    async fn get_flag(&self, key: &str, scope: &str) -> StoreResult<Option<bool>> {
        let value = sqlx::query_scalar::<_, bool>(
            "SELECT value FROM feature_flags WHERE key = $1 AND scope = $2",
        )
        .bind(key)
        .bind(scope)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error(tables::FEATURE_FLAGS))?;
        Ok(value)
    }

    async fn set_flag(&self, key: &str, scope: &str, value: bool) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO feature_flags (key, scope, value, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key, scope) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(scope)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(query_error(tables::FEATURE_FLAGS))?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn reconnect(&self) -> StoreResult<()> {
        // A fresh checkout forces the pool to replace broken connections.
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        drop(conn);
        self.ping().await
    }

    async fn clean_idle_connections(&self) -> StoreResult<u64> {
        // Idle backends older than ten minutes are terminated.
        let terminated = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT count(*) FROM (
                SELECT pg_terminate_backend(pid)
                FROM pg_stat_activity
                WHERE datname = current_database()
                  AND pid <> pg_backend_pid()
                  AND state = 'idle'
                  AND state_change < now() - interval '10 minutes'
            ) terminated
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        if terminated > 0 {
            warn!(terminated = terminated, "Terminated idle database connections");
        }
        Ok(terminated.max(0) as u64)
    }
}
