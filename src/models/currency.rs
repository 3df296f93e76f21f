use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Static allowlist of supported ISO-4217 codes.
const SUPPORTED_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "CNY", "HKD", "SGD", "INR", "BRL",
    "MXN", "ZAR", "AED", "SAR", "KRW", "THB", "MYR",
];

fn allowlist() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| SUPPORTED_CODES.iter().copied().collect())
}

/// A three-letter ISO-4217 currency code validated against a static
/// allowlist. Always stored and compared in uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct Currency(String);

#[derive(Debug, Clone)]
pub struct UnknownCurrencyError(pub String);

impl fmt::Display for UnknownCurrencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown currency code: {}", self.0)
    }
}

impl std::error::Error for UnknownCurrencyError {}

impl Currency {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of minor-unit decimal places this currency is conventionally
    /// quoted in (informational only; balances are always integer minor
    /// units regardless of this value).
    pub fn decimal_places(&self) -> u8 {
        match self.0.as_str() {
            "JPY" | "KRW" => 0,
            _ => 2,
        }
    }
}

impl FromStr for Currency {
    type Err = UnknownCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        if allowlist().contains(upper.as_str()) {
            Ok(Currency(upper))
        } else {
            Err(UnknownCurrencyError(s.to_string()))
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
