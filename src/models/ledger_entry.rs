use crate::models::domain_event::TransferType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Debit or credit side of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entry_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn opposite(&self) -> Self {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }

    /// Sign multiplier used when computing a ledger-derived balance:
    /// credit +, debit −.
    pub fn sign(&self) -> i64 {
        match self {
            EntryType::Credit => 1,
            EntryType::Debit => -1,
        }
    }
}

/// An immutable row in the append-only ledger. Every transfer produces
/// exactly one DEBIT entry on the source account and one CREDIT entry on
/// the destination account, sharing the same `transfer_id`,
/// `amount_minor_units` and `currency`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub entry_type: EntryType,
    pub transfer_type: TransferType,
    pub amount_minor_units: i64,
    pub currency: String,
    pub balance_after_minor_units: i64,
    pub transfer_id: Uuid,
    pub counterparty_account_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[allow(clippy::too_many_arguments)]
    fn new(
        account_id: Uuid,
        entry_type: EntryType,
        transfer_type: TransferType,
        amount_minor_units: i64,
        currency: String,
        balance_after_minor_units: i64,
        transfer_id: Uuid,
        counterparty_account_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id,
            entry_type,
            transfer_type,
            amount_minor_units,
            currency,
            balance_after_minor_units,
            transfer_id,
            counterparty_account_id,
            occurred_at,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn debit(
        account_id: Uuid,
        transfer_type: TransferType,
        amount_minor_units: i64,
        currency: String,
        balance_after_minor_units: i64,
        transfer_id: Uuid,
        counterparty_account_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            account_id,
            EntryType::Debit,
            transfer_type,
            amount_minor_units,
            currency,
            balance_after_minor_units,
            transfer_id,
            counterparty_account_id,
            occurred_at,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn credit(
        account_id: Uuid,
        transfer_type: TransferType,
        amount_minor_units: i64,
        currency: String,
        balance_after_minor_units: i64,
        transfer_id: Uuid,
        counterparty_account_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            account_id,
            EntryType::Credit,
            transfer_type,
            amount_minor_units,
            currency,
            balance_after_minor_units,
            transfer_id,
            counterparty_account_id,
            occurred_at,
        )
    }

    /// Signed amount for summation: positive for credit, negative for debit.
    pub fn signed_amount(&self) -> i64 {
        self.entry_type.sign() * self.amount_minor_units
    }
}
