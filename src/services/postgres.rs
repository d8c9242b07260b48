use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::models::{PlanRecord, PlanStatus, PlanTier, RemoteSubscription};
use crate::plans::{PlanStore, StoreError};
use crate::token::{ConsumptionLog, ConsumptionLogError, ConsumptionRecord};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

/// PostgreSQL client for plan records and email event bookkeeping
///
/// Holds the tables the reconciler and the unsubscribe flow depend on:
/// subscription plans, the append-only email event log used for token
/// replay detection, and the opt-out list.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Record that an email address has opted out.
    ///
    /// Uses INSERT ... ON CONFLICT so a repeated opt-out updates the
    /// timestamp instead of failing. Returns false when the address had
    /// already opted out.
    pub async fn record_opt_out(&self, email: &str) -> Result<bool, PostgresError> {
        let query = r#"
            INSERT INTO email_opt_outs (email, opted_out_at)
            VALUES ($1, NOW())
            ON CONFLICT (email) DO NOTHING
        "#;

        let result = sqlx::query(query).bind(email).execute(&self.pool).await?;
        let newly_opted_out = result.rows_affected() > 0;

        tracing::info!(
            "opt-out recorded for {} (already present: {})",
            email,
            !newly_opted_out
        );

        Ok(newly_opted_out)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn plan_from_row(row: &sqlx::postgres::PgRow) -> PlanRecord {
    let tier: String = row.get("tier");
    let status: String = row.get("status");
    PlanRecord {
        user_id: row.get("user_id"),
        tier: PlanTier::from(tier.as_str()),
        stripe_customer_id: row.get("stripe_customer_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        status: PlanStatus::from(status.as_str()),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        last_synced_at: row.get("last_synced_at"),
    }
}

#[async_trait]
impl PlanStore for PostgresClient {
    async fn plans_with_subscription(&self) -> Result<Vec<PlanRecord>, StoreError> {
        let query = r#"
            SELECT user_id, tier, stripe_customer_id, stripe_subscription_id,
                   status, current_period_start, current_period_end, last_synced_at
            FROM plans
            WHERE stripe_subscription_id IS NOT NULL
            ORDER BY user_id
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        Ok(rows.iter().map(plan_from_row).collect())
    }

    async fn apply_remote_state(
        &self,
        user_id: &str,
        remote: &RemoteSubscription,
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r#"
            UPDATE plans
            SET status = $2,
                current_period_start = $3,
                current_period_end = $4,
                last_synced_at = $5
            WHERE user_id = $1
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .bind(remote.status.as_str())
            .bind(remote.current_period_start)
            .bind(remote.current_period_end)
            .bind(synced_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError(format!("no plan record for {}", user_id)));
        }

        Ok(())
    }
}

#[async_trait]
impl ConsumptionLog for PostgresClient {
    async fn find_consumption(
        &self,
        jti: &str,
    ) -> Result<Option<ConsumptionRecord>, ConsumptionLogError> {
        let query = r#"
            SELECT message_id, user_id, event_type, created_at
            FROM email_events
            WHERE message_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ConsumptionLogError(e.to_string()))?;

        Ok(row.map(|row| ConsumptionRecord {
            message_id: row.get("message_id"),
            user_id: row.get("user_id"),
            event_type: row.get("event_type"),
            consumed_at: row.get("created_at"),
        }))
    }

    async fn append_consumption(
        &self,
        record: &ConsumptionRecord,
    ) -> Result<(), ConsumptionLogError> {
        let query = r#"
            INSERT INTO email_events (message_id, user_id, event_type, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(&record.message_id)
            .bind(&record.user_id)
            .bind(&record.event_type)
            .bind(record.consumed_at)
            .execute(&self.pool)
            .await
            .map_err(|e| ConsumptionLogError(e.to_string()))?;

        Ok(())
    }
}
