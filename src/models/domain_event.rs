use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distinguishes a transfer's role in a ledger movement, carried on both the
/// `LedgerEntry` row and its associated domain events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    Transfer,
    Reversal,
    Bootstrap,
}

/// Events raised by aggregates during a mutation. Buffered in-struct and
/// released only after the aggregate's owning transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum DomainEvent {
    AccountDebited {
        account_id: Uuid,
        amount_minor_units: i64,
        currency: String,
        balance_after_minor_units: i64,
        transfer_id: Uuid,
        transfer_type: TransferType,
        counterparty_account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    AccountCredited {
        account_id: Uuid,
        amount_minor_units: i64,
        currency: String,
        balance_after_minor_units: i64,
        transfer_id: Uuid,
        transfer_type: TransferType,
        counterparty_account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    AccountFrozen {
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    AccountUnfrozen {
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    AccountClosed {
        account_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    TransferCompleted {
        transfer_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
    TransferFailed {
        transfer_id: Uuid,
        failure_code: String,
        failure_reason: String,
        occurred_at: DateTime<Utc>,
    },
    TransferReversed {
        transfer_id: Uuid,
        reversal_transfer_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// The `eventType` tag used both in the outbox payload and the wire
    /// format emitted to external consumers.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::AccountDebited { .. } => "AccountDebited",
            DomainEvent::AccountCredited { .. } => "AccountCredited",
            DomainEvent::AccountFrozen { .. } => "AccountFrozen",
            DomainEvent::AccountUnfrozen { .. } => "AccountUnfrozen",
            DomainEvent::AccountClosed { .. } => "AccountClosed",
            DomainEvent::TransferCompleted { .. } => "TransferCompleted",
            DomainEvent::TransferFailed { .. } => "TransferFailed",
            DomainEvent::TransferReversed { .. } => "TransferReversed",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::AccountDebited { occurred_at, .. }
            | DomainEvent::AccountCredited { occurred_at, .. }
            | DomainEvent::AccountFrozen { occurred_at, .. }
            | DomainEvent::AccountUnfrozen { occurred_at, .. }
            | DomainEvent::AccountClosed { occurred_at, .. }
            | DomainEvent::TransferCompleted { occurred_at, .. }
            | DomainEvent::TransferFailed { occurred_at, .. }
            | DomainEvent::TransferReversed { occurred_at, .. } => *occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_names_match_spec_vocabulary() {
        let event = DomainEvent::AccountFrozen {
            account_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
        };
        assert_eq!(event.event_type(), "AccountFrozen");
    }
}
