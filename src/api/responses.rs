use crate::models::{Account, AccountStatus, EntryType, LedgerEntry, Transfer, TransferStatus, TransferType};
use crate::services::{AccountReconciliationResult, ReconciliationSummary, TransferOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generic success envelope. Error responses use `ErrorResponse` instead so
/// the two shapes never collide on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub per_page: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, per_page: i64) -> Self {
        Self { data, page, per_page }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub owner_name: String,
    pub balance_minor_units: i64,
    pub currency: String,
    pub status: AccountStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            owner_name: account.owner_name,
            balance_minor_units: account.balance_minor_units,
            currency: account.currency,
            status: account.status,
            version: account.version,
            created_at: account.created_at,
            updated_at: account.updated_at,
            closed_at: account.closed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    pub id: Uuid,
    pub reference: String,
    pub source_account_id: Uuid,
    pub destination_account_id: Uuid,
    pub amount_minor_units: i64,
    pub currency: String,
    pub description: Option<String>,
    pub status: TransferStatus,
    pub failure_code: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub reversed_at: Option<DateTime<Utc>>,
}

impl From<Transfer> for TransferResponse {
    fn from(transfer: Transfer) -> Self {
        Self {
            id: transfer.id,
            reference: transfer.reference,
            source_account_id: transfer.source_account_id,
            destination_account_id: transfer.destination_account_id,
            amount_minor_units: transfer.amount_minor_units,
            currency: transfer.currency,
            description: transfer.description,
            status: transfer.status,
            failure_code: transfer.failure_code,
            failure_reason: transfer.failure_reason,
            created_at: transfer.created_at,
            updated_at: transfer.updated_at,
            completed_at: transfer.completed_at,
            failed_at: transfer.failed_at,
            reversed_at: transfer.reversed_at,
        }
    }
}

impl From<TransferOutcome> for TransferResponse {
    fn from(outcome: TransferOutcome) -> Self {
        TransferResponse::from(outcome.transfer)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntryResponse {
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

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            account_id: entry.account_id,
            entry_type: entry.entry_type,
            transfer_type: entry.transfer_type,
            amount_minor_units: entry.amount_minor_units,
            currency: entry.currency,
            balance_after_minor_units: entry.balance_after_minor_units,
            transfer_id: entry.transfer_id,
            counterparty_account_id: entry.counterparty_account_id,
            occurred_at: entry.occurred_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationResponse {
    pub summary: ReconciliationSummary,
    pub drifted: Vec<AccountReconciliationResult>,
}

impl ReconciliationResponse {
    pub fn new(summary: ReconciliationSummary, drifted: Vec<AccountReconciliationResult>) -> Self {
        Self { summary, drifted }
    }
}
