use crate::error::AppError;
use crate::models::currency::Currency;
use crate::models::domain_event::{DomainEvent, TransferType};
use crate::models::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Operational state of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

/// Owner-scoped balance with a lifecycle state machine. Debit, credit,
/// freeze, unfreeze and close are the only mutating operations; the
/// aggregate never performs I/O and buffers the domain events its mutations
/// raise until the caller persists the row and calls `release_events`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub owner_name: String,
    pub balance_minor_units: i64,
    pub currency: String,
    pub status: AccountStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Account {
    /// Opens a new, ACTIVE account with a zero balance.
    pub fn open(owner_name: String, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_name,
            balance_minor_units: 0,
            currency: currency.to_string(),
            status: AccountStatus::Active,
            version: 1,
            created_at: now,
            updated_at: now,
            closed_at: None,
            events: Vec::new(),
        }
    }

    pub fn balance(&self) -> Result<Money, AppError> {
        let currency = Currency::from_str(&self.currency)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        Money::new(self.balance_minor_units, currency).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
    }

    fn require_active(&self) -> Result<(), AppError> {
        if self.status != AccountStatus::Active {
            return Err(AppError::InvalidAccountState {
                account_id: self.id.to_string(),
                detail: format!("account is {:?}, not ACTIVE", self.status),
            });
        }
        Ok(())
    }

    fn require_currency_match(&self, amount: &Money) -> Result<(), AppError> {
        if amount.currency().as_str() != self.currency {
            return Err(AppError::CurrencyMismatch {
                expected: self.currency.clone(),
                actual: amount.currency().to_string(),
            });
        }
        Ok(())
    }

    /// Decreases the balance by `amount`. Requires `ACTIVE` status, matching
    /// currency, and a sufficient balance. Emits `AccountDebited`.
    pub fn debit(
        &mut self,
        amount: &Money,
        transfer_id: Uuid,
        transfer_type: TransferType,
        counterparty_account_id: Uuid,
    ) -> Result<(), AppError> {
        self.require_active()?;
        self.require_currency_match(amount)?;
        if self.balance_minor_units < amount.amount_minor_units() {
            return Err(AppError::InsufficientFunds {
                requested: amount.amount_minor_units(),
                available: self.balance_minor_units,
            });
        }
        self.balance_minor_units -= amount.amount_minor_units();
        self.version += 1;
        let now = Utc::now();
        self.updated_at = now;
        self.events.push(DomainEvent::AccountDebited {
            account_id: self.id,
            amount_minor_units: amount.amount_minor_units(),
            currency: self.currency.clone(),
            balance_after_minor_units: self.balance_minor_units,
            transfer_id,
            transfer_type,
            counterparty_account_id,
            occurred_at: now,
        });
        Ok(())
    }

    /// Increases the balance by `amount`. Requires `ACTIVE` status and
    /// matching currency. Emits `AccountCredited`.
    pub fn credit(
        &mut self,
        amount: &Money,
        transfer_id: Uuid,
        transfer_type: TransferType,
        counterparty_account_id: Uuid,
    ) -> Result<(), AppError> {
        self.require_active()?;
        self.require_currency_match(amount)?;
        self.balance_minor_units += amount.amount_minor_units();
        self.version += 1;
        let now = Utc::now();
        self.updated_at = now;
        self.events.push(DomainEvent::AccountCredited {
            account_id: self.id,
            amount_minor_units: amount.amount_minor_units(),
            currency: self.currency.clone(),
            balance_after_minor_units: self.balance_minor_units,
            transfer_id,
            transfer_type,
            counterparty_account_id,
            occurred_at: now,
        });
        Ok(())
    }

    /// `ACTIVE -> FROZEN`.
    pub fn freeze(&mut self) -> Result<(), AppError> {
        if self.status != AccountStatus::Active {
            return Err(AppError::InvalidAccountState {
                account_id: self.id.to_string(),
                detail: "only an ACTIVE account can be frozen".to_string(),
            });
        }
        self.status = AccountStatus::Frozen;
        self.version += 1;
        let now = Utc::now();
        self.updated_at = now;
        self.events.push(DomainEvent::AccountFrozen {
            account_id: self.id,
            occurred_at: now,
        });
        Ok(())
    }

    /// `FROZEN -> ACTIVE`.
    pub fn unfreeze(&mut self) -> Result<(), AppError> {
        if self.status != AccountStatus::Frozen {
            return Err(AppError::InvalidAccountState {
                account_id: self.id.to_string(),
                detail: "only a FROZEN account can be unfrozen".to_string(),
            });
        }
        self.status = AccountStatus::Active;
        self.version += 1;
        let now = Utc::now();
        self.updated_at = now;
        self.events.push(DomainEvent::AccountUnfrozen {
            account_id: self.id,
            occurred_at: now,
        });
        Ok(())
    }

    /// `{ACTIVE, FROZEN} -> CLOSED`. Requires a zero balance.
    pub fn close(&mut self) -> Result<(), AppError> {
        if self.status == AccountStatus::Closed {
            return Err(AppError::InvalidAccountState {
                account_id: self.id.to_string(),
                detail: "account is already CLOSED".to_string(),
            });
        }
        if self.balance_minor_units != 0 {
            return Err(AppError::NonZeroBalanceOnClose(self.id.to_string()));
        }
        self.status = AccountStatus::Closed;
        self.version += 1;
        let now = Utc::now();
        self.updated_at = now;
        self.closed_at = Some(now);
        self.events.push(DomainEvent::AccountClosed {
            account_id: self.id,
            occurred_at: now,
        });
        Ok(())
    }

    /// Read-only view of the pending event buffer. Does not drain it.
    pub fn peek_events(&self) -> &[DomainEvent] {
        &self.events
    }

    /// Drains and returns the pending event buffer. Must only be called
    /// after the aggregate's mutation has been durably persisted.
    pub fn release_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(amount: i64) -> Money {
        Money::from_parts(amount, "USD").unwrap()
    }

    fn open_account() -> Account {
        Account::open("Jane Doe".to_string(), Currency::from_str("USD").unwrap())
    }

    #[test]
    fn opens_active_with_zero_balance() {
        let account = open_account();
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.balance_minor_units, 0);
        assert_eq!(account.version, 1);
    }

    #[test]
    fn credit_then_debit_round_trips_balance() {
        let mut account = open_account();
        let tx = Uuid::new_v4();
        let counterparty = Uuid::new_v4();
        account
            .credit(&usd(1000), tx, TransferType::Transfer, counterparty)
            .unwrap();
        assert_eq!(account.balance_minor_units, 1000);
        account
            .debit(&usd(250), tx, TransferType::Transfer, counterparty)
            .unwrap();
        assert_eq!(account.balance_minor_units, 750);
        assert_eq!(account.version, 3);
        assert_eq!(account.peek_events().len(), 2);
    }

    #[test]
    fn debit_rejects_insufficient_funds() {
        let mut account = open_account();
        let err = account
            .debit(&usd(1), Uuid::new_v4(), TransferType::Transfer, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds { .. }));
        assert_eq!(account.balance_minor_units, 0);
    }

    #[test]
    fn debit_rejects_currency_mismatch() {
        let mut account = open_account();
        let eur = Money::from_parts(10, "EUR").unwrap();
        let err = account
            .debit(&eur, Uuid::new_v4(), TransferType::Transfer, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, AppError::CurrencyMismatch { .. }));
    }

    #[test]
    fn freeze_unfreeze_is_identity_modulo_version_and_timestamp() {
        let mut account = open_account();
        account.freeze().unwrap();
        assert_eq!(account.status, AccountStatus::Frozen);
        account.unfreeze().unwrap();
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.balance_minor_units, 0);
        assert_eq!(account.version, 3);
    }

    #[test]
    fn debit_rejects_on_frozen_account() {
        let mut account = open_account();
        account.freeze().unwrap();
        let err = account
            .debit(&usd(1), Uuid::new_v4(), TransferType::Transfer, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidAccountState { .. }));
    }

    #[test]
    fn close_requires_zero_balance() {
        let mut account = open_account();
        account
            .credit(&usd(5), Uuid::new_v4(), TransferType::Transfer, Uuid::new_v4())
            .unwrap();
        let err = account.close().unwrap_err();
        assert!(matches!(err, AppError::NonZeroBalanceOnClose(_)));
        assert_eq!(account.status, AccountStatus::Active);
    }

    #[test]
    fn close_succeeds_with_zero_balance_and_is_terminal() {
        let mut account = open_account();
        account.close().unwrap();
        assert_eq!(account.status, AccountStatus::Closed);
        assert!(account.closed_at.is_some());
        assert!(account.freeze().is_err());
        assert!(account.close().is_err());
    }

    #[test]
    fn release_events_drains_the_buffer() {
        let mut account = open_account();
        account.freeze().unwrap();
        assert_eq!(account.peek_events().len(), 1);
        let released = account.release_events();
        assert_eq!(released.len(), 1);
        assert!(account.peek_events().is_empty());
    }
}
