mod common;

use money_movement_core::models::{Currency, EntryType, Money};
use money_movement_core::repositories::LedgerRepository;
use money_movement_core::services::{AccountLifecycleService, ReconciliationService, ReconciliationVerdict, TransferEngine, TransferRequest};
use std::str::FromStr;
use uuid::Uuid;

fn usd() -> Currency {
    Currency::from_str("USD").unwrap()
}

#[tokio::test]
async fn test_transfer_produces_one_debit_and_one_credit_sharing_transfer_id() {
    let pool = common::setup_test_db().await;
    let lifecycle = AccountLifecycleService::new(pool.clone());
    let engine = TransferEngine::new(pool.clone(), 5_000);
    let ledger_repo = LedgerRepository::new(pool.clone());

    let source = lifecycle.open_account("Source".to_string(), usd()).await.unwrap();
    let dest = lifecycle.open_account("Dest".to_string(), usd()).await.unwrap();
    common::fund_account(&pool, source.id, 10_000).await;

    let amount = Money::from_parts(4_000, "USD").unwrap();
    let request = TransferRequest::new(format!("REF-{}", Uuid::new_v4()), source.id, dest.id, amount, None);
    let outcome = engine.execute_transfer(request).await.unwrap();

    let entries = ledger_repo.find_by_transfer(outcome.transfer.id).await.unwrap();
    assert_eq!(entries.len(), 2);

    let debit = entries.iter().find(|e| e.entry_type == EntryType::Debit).unwrap();
    let credit = entries.iter().find(|e| e.entry_type == EntryType::Credit).unwrap();

    assert_eq!(debit.account_id, source.id);
    assert_eq!(debit.counterparty_account_id, dest.id);
    assert_eq!(credit.account_id, dest.id);
    assert_eq!(credit.counterparty_account_id, source.id);
    assert_eq!(debit.amount_minor_units, credit.amount_minor_units);
    assert_eq!(debit.amount_minor_units, 4_000);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_ledger_entries_are_visible_by_account_in_descending_order() {
    let pool = common::setup_test_db().await;
    let lifecycle = AccountLifecycleService::new(pool.clone());
    let engine = TransferEngine::new(pool.clone(), 5_000);
    let ledger_repo = LedgerRepository::new(pool.clone());

    let source = lifecycle.open_account("Source".to_string(), usd()).await.unwrap();
    let dest = lifecycle.open_account("Dest".to_string(), usd()).await.unwrap();
    common::fund_account(&pool, source.id, 10_000).await;

    for i in 0..3 {
        let amount = Money::from_parts(100 + i, "USD").unwrap();
        let request = TransferRequest::new(format!("REF-{}-{}", i, Uuid::new_v4()), source.id, dest.id, amount, None);
        engine.execute_transfer(request).await.unwrap();
    }

    let entries = ledger_repo.list_by_account(source.id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 3);
    for pair in entries.windows(2) {
        assert!(pair[0].occurred_at >= pair[1].occurred_at);
    }

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_reconciliation_reports_ok_for_untouched_account() {
    let pool = common::setup_test_db().await;
    let lifecycle = AccountLifecycleService::new(pool.clone());
    lifecycle.open_account("Untouched".to_string(), usd()).await.unwrap();

    let reconciliation = ReconciliationService::new(pool.clone(), 100);
    let (summary, drifted) = reconciliation.run(0).await.unwrap();

    assert!(summary.accounts_checked >= 1);
    assert!(drifted.iter().all(|d| d.verdict != ReconciliationVerdict::DriftComputed));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_reconciliation_reports_consistent_state_after_transfer() {
    let pool = common::setup_test_db().await;
    let lifecycle = AccountLifecycleService::new(pool.clone());
    let engine = TransferEngine::new(pool.clone(), 5_000);

    let source = lifecycle.open_account("Source".to_string(), usd()).await.unwrap();
    let dest = lifecycle.open_account("Dest".to_string(), usd()).await.unwrap();
    common::fund_account(&pool, source.id, 5_000).await;

    let amount = Money::from_parts(1_500, "USD").unwrap();
    let request = TransferRequest::new(format!("REF-{}", Uuid::new_v4()), source.id, dest.id, amount, None);
    engine.execute_transfer(request).await.unwrap();

    let reconciliation = ReconciliationService::new(pool.clone(), 100);
    let (_, drifted) = reconciliation.run(0).await.unwrap();

    assert!(!drifted.iter().any(|d| d.account_id == source.id));
    assert!(!drifted.iter().any(|d| d.account_id == dest.id));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_reconciliation_detects_drift_when_balance_has_no_matching_ledger_entries() {
    let pool = common::setup_test_db().await;
    let lifecycle = AccountLifecycleService::new(pool.clone());

    let account = lifecycle.open_account("Tampered".to_string(), usd()).await.unwrap();
    // Directly mutates the stored balance without writing ledger entries,
    // simulating an out-of-band write that reconciliation should catch.
    common::fund_account(&pool, account.id, 9_999).await;

    let reconciliation = ReconciliationService::new(pool.clone(), 100);
    let (_, drifted) = reconciliation.run(0).await.unwrap();

    let result = drifted.iter().find(|d| d.account_id == account.id).unwrap();
    assert_eq!(result.verdict, ReconciliationVerdict::DriftComputed);
    assert_eq!(result.stored_balance_minor_units, 9_999);
    assert_eq!(result.computed_balance_minor_units, 0);

    common::cleanup_test_data(&pool).await;
}
