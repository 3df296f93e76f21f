pub mod account;
pub mod currency;
pub mod domain_event;
pub mod ledger_entry;
pub mod money;
pub mod outbox_event;
pub mod transfer;

pub use account::{Account, AccountStatus};
pub use currency::Currency;
pub use domain_event::{DomainEvent, TransferType};
pub use ledger_entry::{EntryType, LedgerEntry};
pub use money::{Money, MoneyError};
pub use outbox_event::OutboxEvent;
pub use transfer::{Transfer, TransferStatus};
