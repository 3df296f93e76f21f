use crate::error::AppError;
use crate::models::domain_event::DomainEvent;
use crate::models::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a transfer. `COMPLETED` and `FAILED` are the only
/// states reachable from `PROCESSING`; `FAILED` and `REVERSED` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Reversed,
}

/// Per-request state machine with reference-based dedup:
/// `(source_account_id, reference)` is unique across the system, which is
/// what makes transport-layer retries resolve to the same row instead of
/// creating a duplicate transfer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transfer {
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
    #[sqlx(default)]
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Transfer {
    /// Builds a `PENDING` transfer. Validates the same-field invariants
    /// from the data model: distinct accounts and a positive amount.
    pub fn create(
        reference: String,
        source_account_id: Uuid,
        destination_account_id: Uuid,
        amount: &Money,
        description: Option<String>,
    ) -> Result<Self, AppError> {
        if source_account_id == destination_account_id {
            return Err(AppError::Validation(
                "source and destination accounts must differ".to_string(),
            ));
        }
        if amount.amount_minor_units() <= 0 {
            return Err(AppError::Validation(
                "transfer amount must be positive".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            reference,
            source_account_id,
            destination_account_id,
            amount_minor_units: amount.amount_minor_units(),
            currency: amount.currency().to_string(),
            description,
            status: TransferStatus::Pending,
            failure_code: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
            reversed_at: None,
            events: Vec::new(),
        })
    }

    fn invalid_transition(&self, to: TransferStatus) -> AppError {
        AppError::InvalidTransferState {
            from: format!("{:?}", self.status),
            to: format!("{:?}", to),
        }
    }

    /// `PENDING -> PROCESSING`.
    pub fn mark_processing(&mut self) -> Result<(), AppError> {
        if self.status != TransferStatus::Pending {
            return Err(self.invalid_transition(TransferStatus::Processing));
        }
        self.status = TransferStatus::Processing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `PROCESSING -> COMPLETED`. Emits `TransferCompleted`.
    pub fn mark_completed(&mut self) -> Result<(), AppError> {
        if self.status != TransferStatus::Processing {
            return Err(self.invalid_transition(TransferStatus::Completed));
        }
        let now = Utc::now();
        self.status = TransferStatus::Completed;
        self.updated_at = now;
        self.completed_at = Some(now);
        self.events.push(DomainEvent::TransferCompleted {
            transfer_id: self.id,
            occurred_at: now,
        });
        Ok(())
    }

    /// `PROCESSING -> FAILED`. Emits `TransferFailed{code, reason}`.
    pub fn mark_failed(&mut self, code: &str, reason: &str) -> Result<(), AppError> {
        if self.status != TransferStatus::Processing {
            return Err(self.invalid_transition(TransferStatus::Failed));
        }
        let now = Utc::now();
        self.status = TransferStatus::Failed;
        self.updated_at = now;
        self.failed_at = Some(now);
        self.failure_code = Some(code.to_string());
        self.failure_reason = Some(reason.to_string());
        self.events.push(DomainEvent::TransferFailed {
            transfer_id: self.id,
            failure_code: code.to_string(),
            failure_reason: reason.to_string(),
            occurred_at: now,
        });
        Ok(())
    }

    /// `COMPLETED -> REVERSED`. Emits `TransferReversed`.
    pub fn mark_reversed(&mut self, reversal_transfer_id: Uuid) -> Result<(), AppError> {
        if self.status != TransferStatus::Completed {
            return Err(self.invalid_transition(TransferStatus::Reversed));
        }
        let now = Utc::now();
        self.status = TransferStatus::Reversed;
        self.updated_at = now;
        self.reversed_at = Some(now);
        self.events.push(DomainEvent::TransferReversed {
            transfer_id: self.id,
            reversal_transfer_id,
            occurred_at: now,
        });
        Ok(())
    }

    pub fn peek_events(&self) -> &[DomainEvent] {
        &self.events
    }

    pub fn release_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}
