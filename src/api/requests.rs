use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to open a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountRequest {
    pub owner_name: String,
    pub currency: String,
}

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl OpenAccountRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.owner_name.trim().is_empty() {
            errors.push(ValidationError {
                field: "owner_name".to_string(),
                message: "owner_name cannot be empty".to_string(),
            });
        }
        if self.currency.len() != 3 {
            errors.push(ValidationError {
                field: "currency".to_string(),
                message: "currency must be a 3-letter ISO 4217 code".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Request to create a transfer. `reference` is the client's dedup token,
/// unique per `source_account_id`; the `Idempotency-Key` header carries the
/// separate request-level idempotency token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    pub reference: String,
    pub source_account_id: Uuid,
    pub destination_account_id: Uuid,
    pub amount_minor_units: i64,
    pub currency: String,
    pub description: Option<String>,
}

impl CreateTransferRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.reference.trim().is_empty() {
            errors.push(ValidationError {
                field: "reference".to_string(),
                message: "reference cannot be empty".to_string(),
            });
        }
        if self.currency.len() != 3 {
            errors.push(ValidationError {
                field: "currency".to_string(),
                message: "currency must be a 3-letter ISO 4217 code".to_string(),
            });
        }
        if self.amount_minor_units <= 0 {
            errors.push(ValidationError {
                field: "amount_minor_units".to_string(),
                message: "amount_minor_units must be positive".to_string(),
            });
        }
        if self.source_account_id == self.destination_account_id {
            errors.push(ValidationError {
                field: "destination_account_id".to_string(),
                message: "source and destination accounts must differ".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Request to reverse a completed transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseTransferRequest {
    pub reference: String,
}

impl ReverseTransferRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.reference.trim().is_empty() {
            errors.push(ValidationError {
                field: "reference".to_string(),
                message: "reference cannot be empty".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Query parameters for listing transfers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListTransfersQuery {
    pub account_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Query parameters for listing an account's ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListLedgerEntriesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_account_request_validation() {
        let valid = OpenAccountRequest {
            owner_name: "Jane Doe".to_string(),
            currency: "USD".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid = OpenAccountRequest {
            owner_name: "".to_string(),
            currency: "US".to_string(),
        };
        assert_eq!(invalid.validate().unwrap_err().len(), 2);
    }

    #[test]
    fn create_transfer_request_validation() {
        let source = Uuid::new_v4();
        let dest = Uuid::new_v4();
        let valid = CreateTransferRequest {
            reference: "r1".to_string(),
            source_account_id: source,
            destination_account_id: dest,
            amount_minor_units: 100,
            currency: "USD".to_string(),
            description: None,
        };
        assert!(valid.validate().is_ok());

        let same_account = CreateTransferRequest {
            reference: "r1".to_string(),
            source_account_id: source,
            destination_account_id: source,
            amount_minor_units: 100,
            currency: "USD".to_string(),
            description: None,
        };
        assert!(same_account.validate().is_err());
    }
}
