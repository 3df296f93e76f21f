pub mod account_repository;
pub mod ledger_repository;
pub mod outbox_repository;
pub mod transfer_repository;

pub use account_repository::AccountRepository;
pub use ledger_repository::LedgerRepository;
pub use outbox_repository::OutboxRepository;
pub use transfer_repository::TransferRepository;

use sqlx::PgPool;

/// Database connection pool type alias.
pub type DbPool = PgPool;
