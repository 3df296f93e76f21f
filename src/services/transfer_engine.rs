use crate::error::{AppError, Result};
use crate::models::{Account, DomainEvent, LedgerEntry, Money, Transfer, TransferStatus, TransferType};
use crate::observability::{get_metrics, LatencyTimer};
use crate::repositories::{AccountRepository, LedgerRepository, OutboxRepository, TransferRepository};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Everything the caller needs to build a Transfer plus the engine's own
/// inputs. Validation of shape (positive amount, distinct accounts) is
/// delegated to `Transfer::create`. `transfer_type` tags the resulting
/// ledger entries and domain events; reversals set it to `Reversal`.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub reference: String,
    pub source_account_id: Uuid,
    pub destination_account_id: Uuid,
    pub amount: Money,
    pub description: Option<String>,
    pub transfer_type: TransferType,
}

impl TransferRequest {
    pub fn new(
        reference: String,
        source_account_id: Uuid,
        destination_account_id: Uuid,
        amount: Money,
        description: Option<String>,
    ) -> Self {
        Self {
            reference,
            source_account_id,
            destination_account_id,
            amount,
            description,
            transfer_type: TransferType::Transfer,
        }
    }
}

/// Outcome of running `ExecuteTransfer`. A transfer that failed for a
/// business reason (insufficient funds, frozen account) is still `Ok` here
/// with `transfer.status == Failed` — it is not an engine error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub transfer: Transfer,
}

/// The transactional core: locks both accounts in a fixed order, applies
/// the double-entry mutation, and writes the resulting domain events to the
/// outbox in the same database transaction as the balance change.
pub struct TransferEngine {
    pool: PgPool,
    account_repo: AccountRepository,
    transfer_repo: TransferRepository,
    ledger_repo: LedgerRepository,
    outbox_repo: OutboxRepository,
    lock_timeout_ms: u64,
}

impl TransferEngine {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            account_repo: AccountRepository::new(pool.clone()),
            transfer_repo: TransferRepository::new(pool.clone()),
            ledger_repo: LedgerRepository::new(pool.clone()),
            outbox_repo: OutboxRepository::new(pool.clone()),
            pool,
            lock_timeout_ms,
        }
    }

    pub async fn execute_transfer(&self, request: TransferRequest) -> Result<TransferOutcome> {
        let timer = LatencyTimer::new();
        let transfer = Transfer::create(
            request.reference.clone(),
            request.source_account_id,
            request.destination_account_id,
            &request.amount,
            request.description.clone(),
        )?;

        let mut db_tx = self.pool.begin().await.map_err(AppError::Database)?;

        let inserted = self.transfer_repo.create(&mut db_tx, &transfer).await;
        let mut transfer = match inserted {
            Ok(row) => row,
            Err(AppError::Database(sqlx::Error::Database(db_err))) if db_err.is_unique_violation() => {
                db_tx.rollback().await.map_err(AppError::Database)?;
                let existing = self
                    .transfer_repo
                    .find_by_reference(request.source_account_id, &request.reference)
                    .await?
                    .ok_or_else(|| {
                        AppError::DuplicateTransferReference {
                            account_id: request.source_account_id.to_string(),
                            reference: request.reference.clone(),
                        }
                    })?;
                return Ok(TransferOutcome { transfer: existing });
            }
            Err(other) => return Err(other),
        };

        // Canonical lock order: sort the two account ids lexicographically
        // so any two concurrent transfers touching the same pair acquire
        // their row locks in the same sequence, making a deadlock cycle
        // structurally impossible.
        let (first_id, second_id) = if request.source_account_id.to_string()
            <= request.destination_account_id.to_string()
        {
            (request.source_account_id, request.destination_account_id)
        } else {
            (request.destination_account_id, request.source_account_id)
        };

        // Bound row-lock acquisition for the rest of this transaction so a
        // stuck counterpart fails fast with a retryable error instead of
        // holding this connection open indefinitely.
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(self.lock_timeout_ms.to_string())
            .execute(&mut *db_tx)
            .await
            .map_err(AppError::from_lock_wait)?;

        let first_locked = self.account_repo.get_by_id_for_update(&mut db_tx, first_id).await?;
        let second_locked = self.account_repo.get_by_id_for_update(&mut db_tx, second_id).await?;

        let (mut source_account, mut dest_account) = if first_id == request.source_account_id {
            (first_locked, second_locked)
        } else {
            (second_locked, first_locked)
        };
        let source_version_before = source_account.version;
        let dest_version_before = dest_account.version;

        transfer.mark_processing()?;

        let mutation_result = self.apply_mutation(
            &transfer,
            &mut source_account,
            &mut dest_account,
            &request.amount,
            request.transfer_type,
        );

        match mutation_result {
            Ok(()) => {
                transfer.mark_completed()?;
            }
            Err(err) if err.is_transfer_domain_failure() => {
                transfer.mark_failed(err.code(), &err.to_string())?;
            }
            Err(err) => return Err(err),
        }

        self.account_repo.save(&mut db_tx, &source_account, source_version_before).await?;
        self.account_repo.save(&mut db_tx, &dest_account, dest_version_before).await?;

        if transfer.status == TransferStatus::Completed {
            let now = chrono::Utc::now();
            let debit_entry = LedgerEntry::debit(
                source_account.id,
                request.transfer_type,
                request.amount.amount_minor_units(),
                request.amount.currency().to_string(),
                source_account.balance_minor_units,
                transfer.id,
                dest_account.id,
                now,
            );
            let credit_entry = LedgerEntry::credit(
                dest_account.id,
                request.transfer_type,
                request.amount.amount_minor_units(),
                request.amount.currency().to_string(),
                dest_account.balance_minor_units,
                transfer.id,
                source_account.id,
                now,
            );
            let ledger_timer = LatencyTimer::new();
            self.ledger_repo.append(&mut db_tx, &debit_entry).await?;
            self.ledger_repo.append(&mut db_tx, &credit_entry).await?;
            get_metrics().record_ledger_write_latency(ledger_timer.elapsed_ms());
        }

        let mut all_events: Vec<(&'static str, Uuid, DomainEvent)> = Vec::new();
        for event in source_account.peek_events() {
            all_events.push(("account", source_account.id, event.clone()));
        }
        for event in dest_account.peek_events() {
            all_events.push(("account", dest_account.id, event.clone()));
        }
        for event in transfer.peek_events() {
            all_events.push(("transfer", transfer.id, event.clone()));
        }

        let transfer = self.transfer_repo.update(&mut db_tx, &transfer).await?;

        for (aggregate_type, aggregate_id, event) in &all_events {
            let payload = serde_json::to_value(event).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
            let outbox_event = crate::models::OutboxEvent::new(aggregate_type, *aggregate_id, event.event_type(), payload);
            self.outbox_repo.save(&mut db_tx, &outbox_event).await?;
        }

        db_tx.commit().await.map_err(AppError::Database)?;

        source_account.release_events();
        dest_account.release_events();

        get_metrics().record_transfer_latency(timer.elapsed_ms());
        match &transfer.status {
            TransferStatus::Completed => get_metrics().record_transfer_completed(request.amount.currency().as_str()),
            TransferStatus::Failed => {
                let failure_code = transfer.failure_code.as_deref().unwrap_or("UNKNOWN");
                get_metrics().record_transfer_failed(request.amount.currency().as_str(), failure_code);
            }
            _ => {}
        }

        Ok(TransferOutcome { transfer })
    }

    /// Applies the balance mutation in memory. Errors here are domain
    /// failures the caller maps onto a FAILED transfer, except when they
    /// indicate the request itself was malformed.
    fn apply_mutation(
        &self,
        transfer: &Transfer,
        source_account: &mut Account,
        dest_account: &mut Account,
        amount: &Money,
        transfer_type: TransferType,
    ) -> Result<()> {
        source_account.debit(amount, transfer.id, transfer_type, dest_account.id)?;
        dest_account.credit(amount, transfer.id, transfer_type, source_account.id)?;
        Ok(())
    }

    /// Reverses a COMPLETED transfer: executes a new transfer moving the
    /// same amount back from destination to source tagged `Reversal`, then
    /// marks the original `REVERSED` pointing at the reversal's id. The two
    /// steps are separate transactions; if the mark-reversed step fails
    /// after the money has already moved back, retrying is safe because the
    /// reversal transfer itself is reference-deduplicated.
    pub async fn reverse_transfer(&self, transfer_id: Uuid, reference: String) -> Result<TransferOutcome> {
        let original = self.transfer_repo.get_by_id(transfer_id).await?;

        if original.status != TransferStatus::Completed {
            return Err(AppError::InvalidTransferState {
                from: format!("{:?}", original.status),
                to: "REVERSED".to_string(),
            });
        }

        let amount = Money::from_parts(original.amount_minor_units, &original.currency)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

        let reversal_request = TransferRequest {
            reference,
            source_account_id: original.destination_account_id,
            destination_account_id: original.source_account_id,
            amount,
            description: Some(format!("reversal of transfer {}", original.id)),
            transfer_type: TransferType::Reversal,
        };

        let reversal_outcome = self.execute_transfer(reversal_request).await?;

        if reversal_outcome.transfer.status != TransferStatus::Completed {
            return Ok(reversal_outcome);
        }

        let mut db_tx = self.pool.begin().await.map_err(AppError::Database)?;
        let mut original = self.transfer_repo.get_by_id(transfer_id).await?;
        original.mark_reversed(reversal_outcome.transfer.id)?;

        let events = original.peek_events().to_vec();
        let original = self.transfer_repo.update(&mut db_tx, &original).await?;
        for event in &events {
            let payload = serde_json::to_value(event).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
            let outbox_event = crate::models::OutboxEvent::new("transfer", original.id, event.event_type(), payload);
            self.outbox_repo.save(&mut db_tx, &outbox_event).await?;
        }
        db_tx.commit().await.map_err(AppError::Database)?;

        get_metrics().record_transfer_reversed(&original.currency);

        Ok(TransferOutcome { transfer: original })
    }
}
