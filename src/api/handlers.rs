use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::str::FromStr;
use uuid::Uuid;

use crate::api::requests::{
    CreateTransferRequest, ListLedgerEntriesQuery, ListTransfersQuery, OpenAccountRequest,
    ReverseTransferRequest,
};
use crate::api::responses::{
    AccountResponse, ApiResponse, ErrorResponse, LedgerEntryResponse, PaginatedResponse,
    ReconciliationResponse, TransferResponse,
};
use crate::error::{AppError, ErrorCategory};
use crate::models::{Currency, Money, TransferStatus};
use crate::repositories::{AccountRepository, LedgerRepository, TransferRepository};
use crate::services::TransferRequest;

use super::routes::AppState;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.category() {
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::RetryAfter | ErrorCategory::Retryable => StatusCode::CONFLICT,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if !matches!(self.category(), ErrorCategory::Internal) {
            tracing::warn!(code = self.code(), "request failed: {}", self);
        } else {
            tracing::error!(code = self.code(), "request failed: {}", self);
        }

        let body = Json(ErrorResponse::new(self.code(), self.to_string()));

        let mut response = (status, body).into_response();
        if matches!(self.category(), ErrorCategory::RetryAfter | ErrorCategory::Retryable) {
            response
                .headers_mut()
                .insert("Retry-After", "1".parse().expect("static header value"));
        }
        response
    }
}

fn validation_response(errors: Vec<crate::api::requests::ValidationError>) -> Response {
    let message = errors
        .into_iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse::new("VALIDATION", message))).into_response()
}

// ============================================================================
// Health, readiness, liveness, metrics
// ============================================================================

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match &state.health_checker {
        Some(checker) => {
            let health = checker.check_all().await;
            let status = if health.status.is_unhealthy() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::OK
            };
            (status, Json(ApiResponse::new(health))).into_response()
        }
        None => (StatusCode::OK, Json(serde_json::json!({ "status": "healthy" }))).into_response(),
    }
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    match &state.health_checker {
        Some(checker) => {
            if checker.is_ready().await {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
        None => {
            if sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ============================================================================
// Account handlers
// ============================================================================

pub async fn open_account(
    State(state): State<AppState>,
    Json(request): Json<OpenAccountRequest>,
) -> Result<Response, Response> {
    if let Err(errors) = request.validate() {
        return Err(validation_response(errors));
    }

    let currency = Currency::from_str(&request.currency)
        .map_err(|e| AppError::Validation(e.to_string()).into_response())?;

    let account = state
        .account_lifecycle
        .open_account(request.owner_name, currency)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(AccountResponse::from(account)))).into_response())
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AccountResponse>>, AppError> {
    let account = AccountRepository::new(state.pool.clone()).get_by_id(id).await?;
    Ok(Json(ApiResponse::new(AccountResponse::from(account))))
}

pub async fn freeze_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AccountResponse>>, AppError> {
    let account = state.account_lifecycle.freeze(id).await?;
    Ok(Json(ApiResponse::new(AccountResponse::from(account))))
}

pub async fn unfreeze_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AccountResponse>>, AppError> {
    let account = state.account_lifecycle.unfreeze(id).await?;
    Ok(Json(ApiResponse::new(AccountResponse::from(account))))
}

pub async fn close_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AccountResponse>>, AppError> {
    let account = state.account_lifecycle.close(id).await?;
    Ok(Json(ApiResponse::new(AccountResponse::from(account))))
}

pub async fn get_account_ledger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListLedgerEntriesQuery>,
) -> Result<Json<ApiResponse<Vec<LedgerEntryResponse>>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let entries = LedgerRepository::new(state.pool.clone())
        .list_by_account(id, limit, offset)
        .await?;

    let entries = entries.into_iter().map(LedgerEntryResponse::from).collect();
    Ok(Json(ApiResponse::new(entries)))
}

// ============================================================================
// Transfer handlers
// ============================================================================

pub async fn create_transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTransferRequest>,
) -> Result<Response, Response> {
    if let Err(errors) = request.validate() {
        return Err(validation_response(errors));
    }

    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(|v| state.idempotency.normalize_client_key(v))
        .ok_or_else(|| {
            AppError::Validation("Idempotency-Key header is required".to_string()).into_response()
        })?;

    let amount = Money::from_parts(request.amount_minor_units, &request.currency)
        .map_err(|e| AppError::Validation(e.to_string()).into_response())?;

    let request_hash = state.idempotency.hash_request(&request);
    let client_id = request.source_account_id.to_string();

    let transfer_request = TransferRequest::new(
        request.reference,
        request.source_account_id,
        request.destination_account_id,
        amount,
        request.description,
    );

    let transfer_engine = state.transfer_engine.clone();
    let outcome = state
        .idempotency
        .execute(&idempotency_key, &client_id, "create_transfer", &request_hash, || async move {
            transfer_engine.execute_transfer(transfer_request).await.map(TransferResponse::from)
        })
        .await
        .map_err(IntoResponse::into_response)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(outcome))).into_response())
}

pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransferResponse>>, AppError> {
    let transfer = TransferRepository::new(state.pool.clone()).get_by_id(id).await?;
    Ok(Json(ApiResponse::new(TransferResponse::from(transfer))))
}

pub async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<ListTransfersQuery>,
) -> Result<Json<PaginatedResponse<TransferResponse>>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let status = query
        .status
        .as_deref()
        .map(parse_transfer_status)
        .transpose()?;

    let transfers = TransferRepository::new(state.pool.clone())
        .find_by_filters(query.account_id, status, per_page, offset)
        .await?;

    let transfers = transfers.into_iter().map(TransferResponse::from).collect();
    Ok(Json(PaginatedResponse::new(transfers, page, per_page)))
}

fn parse_transfer_status(raw: &str) -> Result<TransferStatus, AppError> {
    match raw.to_uppercase().as_str() {
        "PENDING" => Ok(TransferStatus::Pending),
        "PROCESSING" => Ok(TransferStatus::Processing),
        "COMPLETED" => Ok(TransferStatus::Completed),
        "FAILED" => Ok(TransferStatus::Failed),
        "REVERSED" => Ok(TransferStatus::Reversed),
        other => Err(AppError::Validation(format!("unknown transfer status '{}'", other))),
    }
}

pub async fn reverse_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReverseTransferRequest>,
) -> Result<Response, Response> {
    if let Err(errors) = request.validate() {
        return Err(validation_response(errors));
    }

    let outcome = state
        .transfer_engine
        .reverse_transfer(id, request.reference)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(ApiResponse::new(TransferResponse::from(outcome.transfer))).into_response())
}

// ============================================================================
// Reconciliation
// ============================================================================

#[derive(Debug, serde::Deserialize)]
pub struct RunReconciliationQuery {
    pub starting_offset: Option<i64>,
}

pub async fn run_reconciliation(
    State(state): State<AppState>,
    Query(query): Query<RunReconciliationQuery>,
) -> Result<Json<ApiResponse<ReconciliationResponse>>, AppError> {
    let (summary, drifted) = state.reconciliation.run(query.starting_offset.unwrap_or(0)).await?;
    Ok(Json(ApiResponse::new(ReconciliationResponse::new(summary, drifted))))
}
