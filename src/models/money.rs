use crate::models::currency::Currency;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A non-negative amount in a specific currency's minor units (e.g. cents).
/// Represented as a signed integer internally so that intermediate
/// arithmetic (e.g. computing a signed ledger sum) never has to smuggle
/// negativity through an unsigned type, but construction always rejects a
/// negative amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount_minor_units: i64,
    currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("amount must be non-negative, got {0}")]
    NegativeAmount(i64),
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),
    #[error("currency mismatch: {expected} vs {actual}")]
    CurrencyMismatch { expected: String, actual: String },
}

impl Money {
    pub fn new(amount_minor_units: i64, currency: Currency) -> Result<Self, MoneyError> {
        if amount_minor_units < 0 {
            return Err(MoneyError::NegativeAmount(amount_minor_units));
        }
        Ok(Self {
            amount_minor_units,
            currency,
        })
    }

    pub fn from_parts(amount_minor_units: i64, currency_code: &str) -> Result<Self, MoneyError> {
        let currency = Currency::from_str(currency_code)
            .map_err(|e| MoneyError::UnknownCurrency(e.0))?;
        Self::new(amount_minor_units, currency)
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount_minor_units: 0,
            currency,
        }
    }

    pub fn amount_minor_units(&self) -> i64 {
        self.amount_minor_units
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor_units == 0
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                expected: self.currency.to_string(),
                actual: other.currency.to_string(),
            });
        }
        Ok(())
    }

    /// Returns a new `Money` increased by `other`. Fails on currency
    /// mismatch.
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.require_same_currency(other)?;
        Ok(Money {
            amount_minor_units: self.amount_minor_units + other.amount_minor_units,
            currency: self.currency.clone(),
        })
    }

    /// Returns a new `Money` decreased by `other`. Fails on currency
    /// mismatch or if the result would go negative.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.require_same_currency(other)?;
        let result = self.amount_minor_units - other.amount_minor_units;
        if result < 0 {
            return Err(MoneyError::NegativeAmount(result));
        }
        Ok(Money {
            amount_minor_units: result,
            currency: self.currency.clone(),
        })
    }

    pub fn has_sufficient_funds(&self, amount: &Money) -> bool {
        self.currency == amount.currency && self.amount_minor_units >= amount.amount_minor_units
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_minor_units, self.currency)
    }
}
