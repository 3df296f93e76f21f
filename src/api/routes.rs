use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rskafka::client::Client as KafkaClient;
use sqlx::PgPool;
use std::sync::Arc;

use super::handlers;
use crate::config::ApplicationSettings;
use crate::idempotency::IdempotencyHandler;
use crate::observability::HealthChecker;
use crate::services::{AccountLifecycleService, ReconciliationService, TransferEngine};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis_client: redis::Client,
    pub kafka_client: Option<Arc<KafkaClient>>,
    pub metrics_handle: Option<PrometheusHandle>,
    pub health_checker: Option<Arc<HealthChecker>>,
    pub account_lifecycle: Arc<AccountLifecycleService>,
    pub transfer_engine: Arc<TransferEngine>,
    pub reconciliation: Arc<ReconciliationService>,
    pub idempotency: Arc<IdempotencyHandler>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        redis_client: redis::Client,
        kafka_client: Option<Arc<KafkaClient>>,
        idempotency: Arc<IdempotencyHandler>,
        settings: &ApplicationSettings,
    ) -> Self {
        Self {
            account_lifecycle: Arc::new(AccountLifecycleService::new(pool.clone())),
            transfer_engine: Arc::new(TransferEngine::new(pool.clone(), settings.lock_wait_timeout_ms)),
            reconciliation: Arc::new(ReconciliationService::new(pool.clone(), settings.reconciliation_page_size)),
            idempotency,
            pool,
            redis_client,
            kafka_client,
            metrics_handle: None,
            health_checker: None,
        }
    }

    /// Adds metrics handle to the state.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Adds health checker to the state.
    pub fn with_health_checker(mut self, checker: Arc<HealthChecker>) -> Self {
        self.health_checker = Some(checker);
        self
    }

    /// Returns true if Kafka is connected.
    pub fn kafka_connected(&self) -> bool {
        self.kafka_client.is_some()
    }
}

/// Creates the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Account endpoints
        .route("/accounts", post(handlers::open_account))
        .route("/accounts/:id", get(handlers::get_account))
        .route("/accounts/:id/freeze", post(handlers::freeze_account))
        .route("/accounts/:id/unfreeze", post(handlers::unfreeze_account))
        .route("/accounts/:id/close", post(handlers::close_account))
        .route("/accounts/:id/ledger", get(handlers::get_account_ledger))
        // Transfer endpoints
        .route("/transfers", post(handlers::create_transfer))
        .route("/transfers", get(handlers::list_transfers))
        .route("/transfers/:id", get(handlers::get_transfer))
        .route("/transfers/:id/reverse", post(handlers::reverse_transfer))
        // Reconciliation
        .route("/reconciliation/run", get(handlers::run_reconciliation))
        .with_state(state)
}
