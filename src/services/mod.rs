pub mod account_lifecycle;
pub mod reconciliation;
pub mod transfer_engine;

pub use account_lifecycle::AccountLifecycleService;
pub use reconciliation::{
    AccountReconciliationResult, ReconciliationService, ReconciliationSummary,
    ReconciliationVerdict,
};
pub use transfer_engine::{TransferEngine, TransferOutcome, TransferRequest};
