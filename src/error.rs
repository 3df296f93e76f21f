use serde::Serialize;

/// Category used by the HTTP adapter to pick a status code and retry
/// semantics. Kept separate from the variant so the mapping lives in one
/// place instead of being re-derived per handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    NotFound,
    Validation,
    Conflict,
    RetryAfter,
    Retryable,
    Internal,
}

/// Flat error enum for the whole crate. Every collaborator (HTTP adapter,
/// background jobs, CLI-ish entry points) maps a variant to its own wire
/// format through `code()` / `category()` rather than matching on this type
/// directly.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("account {account_id} is not in a valid state for this operation: {detail}")]
    InvalidAccountState { account_id: String, detail: String },

    #[error("cannot close account {0} with non-zero balance")]
    NonZeroBalanceOnClose(String),

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    #[error("transfer not found: {0}")]
    TransferNotFound(String),

    #[error("invalid transfer state transition from {from} to {to}")]
    InvalidTransferState { from: String, to: String },

    #[error("transfer reference '{reference}' already used for account {account_id} with a different request")]
    DuplicateTransferReference { account_id: String, reference: String },

    #[error("idempotency key '{0}' was already used with a different request body")]
    IdempotencyKeyConflict(String),

    #[error("a request with idempotency key '{0}' is already in progress")]
    RequestInProgress(String),

    #[error("timed out waiting for a row lock")]
    LockTimeout,

    #[error("concurrent modification detected, please retry")]
    ConcurrencyConflict,

    #[error("outbox events may only be written inside an active transaction")]
    OutboxOutsideTransaction,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::AccountNotFound(_)
            | AppError::TransferNotFound(_)
            | AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::Validation(_) | AppError::CurrencyMismatch { .. } => {
                ErrorCategory::Validation
            }
            AppError::InvalidAccountState { .. }
            | AppError::NonZeroBalanceOnClose(_)
            | AppError::InsufficientFunds { .. }
            | AppError::InvalidTransferState { .. }
            | AppError::DuplicateTransferReference { .. }
            | AppError::IdempotencyKeyConflict(_) => ErrorCategory::Conflict,
            AppError::RequestInProgress(_) => ErrorCategory::RetryAfter,
            AppError::LockTimeout | AppError::ConcurrencyConflict => ErrorCategory::Retryable,
            AppError::OutboxOutsideTransaction
            | AppError::Database(_)
            | AppError::Redis(_)
            | AppError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Machine-readable code matching the kinds in the error-handling design.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            AppError::InvalidAccountState { .. } => "INVALID_ACCOUNT_STATE",
            AppError::NonZeroBalanceOnClose(_) => "NON_ZERO_BALANCE_ON_CLOSE",
            AppError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AppError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            AppError::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            AppError::InvalidTransferState { .. } => "INVALID_TRANSFER_STATE",
            AppError::DuplicateTransferReference { .. } => "DUPLICATE_TRANSFER_REFERENCE",
            AppError::IdempotencyKeyConflict(_) => "IDEMPOTENCY_KEY_CONFLICT",
            AppError::RequestInProgress(_) => "REQUEST_IN_PROGRESS",
            AppError::LockTimeout => "LOCK_TIMEOUT",
            AppError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            AppError::OutboxOutsideTransaction => "OUTBOX_OUTSIDE_TRANSACTION",
            AppError::Validation(_) => "VALIDATION",
            AppError::Database(_) => "DATABASE",
            AppError::Redis(_) => "REDIS",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// True for the domain failures ExecuteTransfer must catch and record as
    /// a FAILED transfer rather than letting it propagate.
    pub fn is_transfer_domain_failure(&self) -> bool {
        matches!(
            self,
            AppError::InsufficientFunds { .. }
                | AppError::CurrencyMismatch { .. }
                | AppError::InvalidAccountState { .. }
        )
    }

    /// Maps a `sqlx` error to `LockTimeout` when its SQLSTATE indicates a
    /// lock-wait or statement timeout expired (`55P03` lock_not_available,
    /// `57014` query_canceled), else wraps it as a generic database error.
    pub fn from_lock_wait(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if matches!(db_err.code().as_deref(), Some("55P03") | Some("57014")) {
                return AppError::LockTimeout;
            }
        }
        AppError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
