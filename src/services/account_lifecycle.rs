use crate::error::Result;
use crate::models::{Account, Currency, DomainEvent};
use crate::repositories::{AccountRepository, OutboxRepository};
use sqlx::PgPool;
use uuid::Uuid;

/// Single-account mutations: open, freeze, unfreeze, close. Each follows
/// the same shape as the transfer engine with one lock instead of two —
/// lock, mutate, persist with a version check, write the outbox row, commit,
/// release events.
pub struct AccountLifecycleService {
    pool: PgPool,
    account_repo: AccountRepository,
    outbox_repo: OutboxRepository,
}

impl AccountLifecycleService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            account_repo: AccountRepository::new(pool.clone()),
            outbox_repo: OutboxRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn open_account(&self, owner_name: String, currency: Currency) -> Result<Account> {
        let account = Account::open(owner_name, currency);
        self.account_repo.create(&account).await
    }

    pub async fn freeze(&self, account_id: Uuid) -> Result<Account> {
        self.mutate(account_id, |account| account.freeze()).await
    }

    pub async fn unfreeze(&self, account_id: Uuid) -> Result<Account> {
        self.mutate(account_id, |account| account.unfreeze()).await
    }

    pub async fn close(&self, account_id: Uuid) -> Result<Account> {
        self.mutate(account_id, |account| account.close()).await
    }

    async fn mutate<F>(&self, account_id: Uuid, transition: F) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        let mut db_tx = self.pool.begin().await.map_err(crate::error::AppError::Database)?;

        let mut account = self.account_repo.get_by_id_for_update(&mut db_tx, account_id).await?;
        let version_before = account.version;

        transition(&mut account)?;
        let events: Vec<DomainEvent> = account.peek_events().to_vec();

        let persisted = self.account_repo.save(&mut db_tx, &account, version_before).await?;

        for event in &events {
            let payload = serde_json::to_value(event).map_err(|e| crate::error::AppError::Internal(anyhow::anyhow!(e)))?;
            let outbox_event = crate::models::OutboxEvent::new("account", account.id, event.event_type(), payload);
            self.outbox_repo.save(&mut db_tx, &outbox_event).await?;
        }

        db_tx.commit().await.map_err(crate::error::AppError::Database)?;

        account.release_events();
        Ok(persisted)
    }
}
