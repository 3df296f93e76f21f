use crate::error::{AppError, Result};
use crate::models::{Transfer, TransferStatus};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const TRANSFER_COLUMNS: &str = "id, reference, source_account_id, destination_account_id, amount_minor_units, currency, description, status, failure_code, failure_reason, created_at, updated_at, completed_at, failed_at, reversed_at";

/// Repository for Transfer persistence. Inserts and status updates happen
/// inside the same transaction the engine uses to lock and mutate the two
/// accounts, so every method here takes the transaction explicitly rather
/// than opening its own.
pub struct TransferRepository {
    pool: PgPool,
}

impl TransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the transfer row. Relies on the `(source_account_id,
    /// reference)` unique constraint to reject a duplicate; the caller
    /// translates a unique-violation into `DuplicateTransferReference`.
    pub async fn create(&self, tx: &mut Transaction<'_, Postgres>, transfer: &Transfer) -> Result<Transfer> {
        sqlx::query_as::<_, Transfer>(&format!(
            r#"
            INSERT INTO transfers ({TRANSFER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(transfer.id)
        .bind(&transfer.reference)
        .bind(transfer.source_account_id)
        .bind(transfer.destination_account_id)
        .bind(transfer.amount_minor_units)
        .bind(&transfer.currency)
        .bind(&transfer.description)
        .bind(transfer.status)
        .bind(&transfer.failure_code)
        .bind(&transfer.failure_reason)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .bind(transfer.completed_at)
        .bind(transfer.failed_at)
        .bind(transfer.reversed_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update(&self, tx: &mut Transaction<'_, Postgres>, transfer: &Transfer) -> Result<Transfer> {
        sqlx::query_as::<_, Transfer>(&format!(
            r#"
            UPDATE transfers
            SET status = $2, failure_code = $3, failure_reason = $4, updated_at = $5,
                completed_at = $6, failed_at = $7, reversed_at = $8
            WHERE id = $1
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(transfer.id)
        .bind(transfer.status)
        .bind(&transfer.failure_code)
        .bind(&transfer.failure_reason)
        .bind(transfer.updated_at)
        .bind(transfer.completed_at)
        .bind(transfer.failed_at)
        .bind(transfer.reversed_at)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::TransferNotFound(transfer.id.to_string()))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Transfer> {
        sqlx::query_as::<_, Transfer>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::TransferNotFound(id.to_string()))
    }

    pub async fn find_by_reference(
        &self,
        source_account_id: Uuid,
        reference: &str,
    ) -> Result<Option<Transfer>> {
        sqlx::query_as::<_, Transfer>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS} FROM transfers
            WHERE source_account_id = $1 AND reference = $2
            "#
        ))
        .bind(source_account_id)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Lists transfers touching `account_id` as either leg, optionally
    /// narrowed by status. `limit` is clamped by the caller to the
    /// configured page-size ceiling before reaching here.
    pub async fn find_by_filters(
        &self,
        account_id: Option<Uuid>,
        status: Option<TransferStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transfer>> {
        sqlx::query_as::<_, Transfer>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE ($1::uuid IS NULL OR source_account_id = $1 OR destination_account_id = $1)
              AND ($2::transfer_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(account_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }
}
