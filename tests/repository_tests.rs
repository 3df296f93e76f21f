mod common;

use chrono::Utc;
use money_movement_core::models::{Account, AccountStatus, Currency, Money, OutboxEvent, Transfer, TransferStatus};
use money_movement_core::repositories::{AccountRepository, LedgerRepository, OutboxRepository, TransferRepository};
use std::str::FromStr;
use uuid::Uuid;

fn usd() -> Currency {
    Currency::from_str("USD").unwrap()
}

#[tokio::test]
async fn test_account_repository_create_and_get() {
    let pool = common::setup_test_db().await;
    let repo = AccountRepository::new(pool.clone());

    let account = Account::open("Repo Test".to_string(), usd());
    let created = repo.create(&account).await.expect("create failed");
    assert_eq!(created.id, account.id);
    assert_eq!(created.status, AccountStatus::Active);
    assert_eq!(created.balance_minor_units, 0);

    let fetched = repo.get_by_id(account.id).await.expect("get failed");
    assert_eq!(fetched.id, account.id);
    assert_eq!(fetched.owner_name, "Repo Test");

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_account_repository_get_missing_errors() {
    let pool = common::setup_test_db().await;
    let repo = AccountRepository::new(pool.clone());

    let result = repo.get_by_id(Uuid::new_v4()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_account_repository_save_rejects_stale_version() {
    let pool = common::setup_test_db().await;
    let repo = AccountRepository::new(pool.clone());

    let account = Account::open("Version Test".to_string(), usd());
    repo.create(&account).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let mut loaded = repo.get_by_id_for_update(&mut tx, account.id).await.unwrap();
    loaded.freeze().unwrap();
    let stale_previous_version = loaded.version; // wrong: should be version before mutation
    let result = repo.save(&mut tx, &loaded, stale_previous_version).await;
    assert!(result.is_err());
    tx.rollback().await.unwrap();

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_account_repository_list_filters_by_status() {
    let pool = common::setup_test_db().await;
    let repo = AccountRepository::new(pool.clone());

    let active = Account::open("Active Acct".to_string(), usd());
    repo.create(&active).await.unwrap();

    let mut closed = Account::open("Closed Acct".to_string(), usd());
    closed.close().unwrap();
    repo.create(&closed).await.unwrap();

    let active_accounts = repo.list(Some(AccountStatus::Active), Some("USD"), 50, 0).await.unwrap();
    assert!(active_accounts.iter().any(|a| a.id == active.id));
    assert!(!active_accounts.iter().any(|a| a.id == closed.id));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_transfer_repository_create_and_find_by_reference() {
    let pool = common::setup_test_db().await;
    let account_repo = AccountRepository::new(pool.clone());
    let transfer_repo = TransferRepository::new(pool.clone());

    let source = Account::open("Source".to_string(), usd());
    let dest = Account::open("Dest".to_string(), usd());
    account_repo.create(&source).await.unwrap();
    account_repo.create(&dest).await.unwrap();

    let amount = Money::from_parts(5_000, "USD").unwrap();
    let reference = format!("REF-{}", Uuid::new_v4());
    let transfer = Transfer::create(reference.clone(), source.id, dest.id, &amount, None).unwrap();

    let mut tx = pool.begin().await.unwrap();
    let created = transfer_repo.create(&mut tx, &transfer).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(created.status, TransferStatus::Pending);

    let found = transfer_repo.find_by_reference(source.id, &reference).await.unwrap();
    assert!(found.is_some());
    assert_eq!(found.unwrap().id, transfer.id);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_transfer_repository_find_by_filters() {
    let pool = common::setup_test_db().await;
    let account_repo = AccountRepository::new(pool.clone());
    let transfer_repo = TransferRepository::new(pool.clone());

    let source = Account::open("Source".to_string(), usd());
    let dest = Account::open("Dest".to_string(), usd());
    account_repo.create(&source).await.unwrap();
    account_repo.create(&dest).await.unwrap();

    let amount = Money::from_parts(1_000, "USD").unwrap();
    for _ in 0..3 {
        let transfer = Transfer::create(format!("REF-{}", Uuid::new_v4()), source.id, dest.id, &amount, None).unwrap();
        let mut tx = pool.begin().await.unwrap();
        transfer_repo.create(&mut tx, &transfer).await.unwrap();
        tx.commit().await.unwrap();
    }

    let found = transfer_repo.find_by_filters(Some(source.id), None, 10, 0).await.unwrap();
    assert!(found.len() >= 3);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_ledger_repository_append_and_computed_balance() {
    let pool = common::setup_test_db().await;
    let account_repo = AccountRepository::new(pool.clone());
    let transfer_repo = TransferRepository::new(pool.clone());
    let ledger_repo = LedgerRepository::new(pool.clone());

    let source = Account::open("Source".to_string(), usd());
    let dest = Account::open("Dest".to_string(), usd());
    account_repo.create(&source).await.unwrap();
    account_repo.create(&dest).await.unwrap();

    let amount = Money::from_parts(2_000, "USD").unwrap();
    let transfer = Transfer::create(format!("REF-{}", Uuid::new_v4()), source.id, dest.id, &amount, None).unwrap();

    let mut tx = pool.begin().await.unwrap();
    transfer_repo.create(&mut tx, &transfer).await.unwrap();

    let debit = money_movement_core::models::LedgerEntry::debit(
        source.id,
        money_movement_core::models::TransferType::Transfer,
        2_000,
        "USD".to_string(),
        8_000,
        transfer.id,
        dest.id,
        Utc::now(),
    );
    let credit = money_movement_core::models::LedgerEntry::credit(
        dest.id,
        money_movement_core::models::TransferType::Transfer,
        2_000,
        "USD".to_string(),
        2_000,
        transfer.id,
        source.id,
        Utc::now(),
    );
    ledger_repo.append(&mut tx, &debit).await.unwrap();
    ledger_repo.append(&mut tx, &credit).await.unwrap();
    tx.commit().await.unwrap();

    let computed = ledger_repo.computed_balance(dest.id).await.unwrap();
    assert_eq!(computed, 2_000);

    let entries = ledger_repo.find_by_transfer(transfer.id).await.unwrap();
    assert_eq!(entries.len(), 2);

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_outbox_repository_pending_and_mark_published() {
    let pool = common::setup_test_db().await;
    let account_repo = AccountRepository::new(pool.clone());
    let outbox_repo = OutboxRepository::new(pool.clone());

    let account = Account::open("Outbox Test".to_string(), usd());
    account_repo.create(&account).await.unwrap();

    let event = OutboxEvent::new(
        "account",
        account.id,
        "AccountFrozen",
        serde_json::json!({"account_id": account.id}),
    );

    let mut tx = pool.begin().await.unwrap();
    let saved = outbox_repo.save(&mut tx, &event).await.unwrap();
    tx.commit().await.unwrap();

    let pending = outbox_repo.pending(10, 100, Utc::now()).await.unwrap();
    assert!(pending.iter().any(|e| e.id == saved.id));

    outbox_repo.mark_published(saved.id, Utc::now()).await.unwrap();

    let pending_after = outbox_repo.pending(10, 100, Utc::now()).await.unwrap();
    assert!(!pending_after.iter().any(|e| e.id == saved.id));

    common::cleanup_test_data(&pool).await;
}

#[tokio::test]
async fn test_outbox_repository_bump_failure_and_dead_letter_count() {
    let pool = common::setup_test_db().await;
    let account_repo = AccountRepository::new(pool.clone());
    let outbox_repo = OutboxRepository::new(pool.clone());

    let account = Account::open("Outbox Failure Test".to_string(), usd());
    account_repo.create(&account).await.unwrap();

    let event = OutboxEvent::new("account", account.id, "AccountFrozen", serde_json::json!({}));
    let mut tx = pool.begin().await.unwrap();
    let saved = outbox_repo.save(&mut tx, &event).await.unwrap();
    tx.commit().await.unwrap();

    outbox_repo.bump_failure(saved.id, 100, 0).await.unwrap();

    let dead_lettered = outbox_repo.count_dead_lettered(100).await.unwrap();
    assert!(dead_lettered >= 1);

    common::cleanup_test_data(&pool).await;
}
