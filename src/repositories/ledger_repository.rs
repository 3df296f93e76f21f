use crate::error::{AppError, Result};
use crate::models::LedgerEntry;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const ENTRY_COLUMNS: &str = "id, account_id, entry_type, transfer_type, amount_minor_units, currency, balance_after_minor_units, transfer_id, counterparty_account_id, occurred_at";

/// Repository for the append-only ledger. There is deliberately no update
/// or delete here: once written, an entry is immutable.
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a single entry inside `tx`. Both legs of a transfer are
    /// appended this way, in the same transaction as the account updates
    /// they correspond to.
    pub async fn append(&self, tx: &mut Transaction<'_, Postgres>, entry: &LedgerEntry) -> Result<LedgerEntry> {
        sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            INSERT INTO ledger_entries ({ENTRY_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(entry.id)
        .bind(entry.account_id)
        .bind(entry.entry_type)
        .bind(entry.transfer_type)
        .bind(entry.amount_minor_units)
        .bind(&entry.currency)
        .bind(entry.balance_after_minor_units)
        .bind(entry.transfer_id)
        .bind(entry.counterparty_account_id)
        .bind(entry.occurred_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_by_account(
        &self,
        account_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>> {
        sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY occurred_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_transfer(&self, transfer_id: Uuid) -> Result<Vec<LedgerEntry>> {
        sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE transfer_id = $1 ORDER BY occurred_at"
        ))
        .bind(transfer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Sums every entry for the account, signed (credit +, debit -). This
    /// is the "computed balance" the reconciliation verifier compares
    /// against the account row's stored balance.
    pub async fn computed_balance(&self, account_id: Uuid) -> Result<i64> {
        let row: (Option<i64>,) = sqlx::query_as(
            r#"
            SELECT SUM(
                CASE entry_type WHEN 'CREDIT' THEN amount_minor_units ELSE -amount_minor_units END
            )
            FROM ledger_entries
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0.unwrap_or(0))
    }

    /// `balance_after_minor_units` of the most recently written entry for
    /// the account, used as the alternate reconciliation reference point.
    pub async fn latest_balance_after(&self, account_id: Uuid) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT balance_after_minor_units
            FROM ledger_entries
            WHERE account_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(|r| r.0))
    }
}
