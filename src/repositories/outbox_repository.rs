use crate::error::{AppError, Result};
use crate::models::outbox_event::{backoff_seconds, OutboxEvent};
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};

const OUTBOX_COLUMNS: &str = "id, aggregate_type, aggregate_id, event_type, payload, occurred_at, published_at, attempts, next_attempt_at";

/// Repository for the transactional outbox. `save` is always called inside
/// the same transaction as the aggregate mutation it records; every other
/// method belongs to the publisher poller and runs against the pool
/// directly.
pub struct OutboxRepository {
    pool: PgPool,
}

impl OutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, tx: &mut Transaction<'_, Postgres>, event: &OutboxEvent) -> Result<OutboxEvent> {
        sqlx::query_as::<_, OutboxEvent>(&format!(
            r#"
            INSERT INTO outbox_events ({OUTBOX_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {OUTBOX_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.aggregate_type)
        .bind(event.aggregate_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.occurred_at)
        .bind(event.published_at)
        .bind(event.attempts)
        .bind(event.next_attempt_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)
    }

    /// Rows due for delivery, oldest first: unpublished, below the
    /// dead-letter attempt ceiling, and due for retry.
    pub async fn pending(&self, limit: i64, max_attempts: i32, now: DateTime<Utc>) -> Result<Vec<OutboxEvent>> {
        sqlx::query_as::<_, OutboxEvent>(&format!(
            r#"
            SELECT {OUTBOX_COLUMNS}
            FROM outbox_events
            WHERE published_at IS NULL
              AND attempts < $1
              AND next_attempt_at <= $2
            ORDER BY id
            LIMIT $3
            FOR UPDATE SKIP LOCKED
            "#
        ))
        .bind(max_attempts)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn mark_published(&self, id: uuid::Uuid, published_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE outbox_events SET published_at = $2 WHERE id = $1")
            .bind(id)
            .bind(published_at)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    /// Records a failed delivery attempt and schedules the next retry with
    /// exponential backoff plus jitter, capped at the configured ceiling.
    pub async fn bump_failure(&self, id: uuid::Uuid, attempts: i32, jitter_seconds: i64) -> Result<()> {
        let delay = backoff_seconds(attempts) + jitter_seconds;
        let next_attempt_at = Utc::now() + Duration::seconds(delay);
        sqlx::query(
            "UPDATE outbox_events SET attempts = $2, next_attempt_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(attempts)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn count_dead_lettered(&self, max_attempts: i32) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM outbox_events WHERE published_at IS NULL AND attempts >= $1",
        )
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;
        Ok(row.0)
    }
}
