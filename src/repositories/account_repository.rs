use crate::error::{AppError, Result};
use crate::models::{Account, AccountStatus};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, owner_name, balance_minor_units, currency, status, version, created_at, updated_at, closed_at";

/// Repository for Account persistence. Every mutating caller is expected to
/// route through `get_by_id_for_update` inside the transaction that will
/// write the mutation back, so the row lock is held across the read and the
/// write; `get_by_id` is for read-only callers that never mutate the row.
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, account: &Account) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (id, owner_name, balance_minor_units, currency, status, version, created_at, updated_at, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.id)
        .bind(&account.owner_name)
        .bind(account.balance_minor_units)
        .bind(&account.currency)
        .bind(account.status)
        .bind(account.version)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(account.closed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Read-only lookup. Does not take a row lock; never use this before a
    /// mutation in the same transaction.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Locks the row with `FOR UPDATE` inside `tx`. Callers that need to
    /// lock two accounts at once must sort the ids first and call this
    /// twice in that order to avoid a deadlock against a concurrent
    /// transfer moving funds the other way.
    pub async fn get_by_id_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::from_lock_wait)?
        .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    pub async fn list(
        &self,
        status: Option<AccountStatus>,
        currency: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Account>> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts
            WHERE ($1::account_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR currency = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(status)
        .bind(currency)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Persists a mutated aggregate inside `tx`, enforcing the optimistic
    /// version check as a second line of defense behind the row lock taken
    /// by `get_by_id_for_update`. `account.version` must already be the
    /// post-mutation value; `expected_previous_version` is the version the
    /// row had when it was loaded.
    pub async fn save(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account: &Account,
        expected_previous_version: i32,
    ) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET owner_name = $2, balance_minor_units = $3, currency = $4, status = $5,
                version = $6, updated_at = $7, closed_at = $8
            WHERE id = $1 AND version = $9
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.id)
        .bind(&account.owner_name)
        .bind(account.balance_minor_units)
        .bind(&account.currency)
        .bind(account.status)
        .bind(account.version)
        .bind(account.updated_at)
        .bind(account.closed_at)
        .bind(expected_previous_version)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?;

        row.ok_or(AppError::ConcurrencyConflict)
    }

    pub async fn count(&self, status: Option<AccountStatus>) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM accounts WHERE ($1::account_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.0)
    }
}
