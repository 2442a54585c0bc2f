//! Transfer handlers

use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{
    ApiResult, CreateTransactionRequest, ReferenceId, StrictJson, TransactionData, ok,
};

/// Create transaction endpoint
///
/// POST /api/transactions
///
/// Moves `amount` between two customer accounts. Replays under the same
/// `referenceId` return the original transaction with status
/// `ALREADY_PROCESSED`, whatever the new body says.
#[utoipa::path(
    post,
    path = "/api/transactions",
    request_body = CreateTransactionRequest,
    params(
        ("referenceId" = String, Header, description = "Idempotency key (UUID)")
    ),
    responses(
        (status = 200, description = "Transfer committed or already processed", body = TransactionData, content_type = "application/json"),
        (status = 400, description = "Invalid parameters, unknown account or insufficient balance"),
        (status = 503, description = "Lock timeout or storage unavailable, safe to retry")
    ),
    tag = "Transfer"
)]
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    ReferenceId(key): ReferenceId,
    StrictJson(req): StrictJson<CreateTransactionRequest>,
) -> ApiResult<TransactionData> {
    let valid = state.validator.transfer(&req)?;

    let outcome = state
        .engine
        .transfer(
            valid.source,
            valid.destination,
            valid.amount,
            &key.to_string(),
        )
        .await?;

    ok(TransactionData::new(outcome.value, outcome.disposition))
}
