//! Account handlers

use std::sync::Arc;

use axum::extract::{Path, State};

use super::super::state::AppState;
use super::super::types::{
    AccountData, ApiResult, CreateAccountRequest, ReferenceId, StrictJson, created, ok,
};

/// Create account endpoint
///
/// POST /api/accounts
///
/// The opening balance is funded from the system account. A retry with the
/// same `referenceId` returns the account with 200 instead of 201.
#[utoipa::path(
    post,
    path = "/api/accounts",
    request_body = CreateAccountRequest,
    params(
        ("referenceId" = String, Header, description = "Idempotency key (UUID)")
    ),
    responses(
        (status = 201, description = "Account created", body = AccountData, content_type = "application/json"),
        (status = 200, description = "Already processed under this referenceId", body = AccountData),
        (status = 400, description = "Invalid parameters or duplicate account_id"),
        (status = 503, description = "Lock timeout or storage unavailable, safe to retry")
    ),
    tag = "Account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    ReferenceId(key): ReferenceId,
    StrictJson(req): StrictJson<CreateAccountRequest>,
) -> ApiResult<AccountData> {
    let valid = state.validator.create_account(&req)?;

    let outcome = state
        .engine
        .create_account(valid.account_id, valid.initial_balance, &key.to_string())
        .await?;

    if outcome.is_replay() {
        ok(outcome.value.into())
    } else {
        created(outcome.value.into())
    }
}

/// Get account endpoint
///
/// GET /api/accounts/{account_id}
#[utoipa::path(
    get,
    path = "/api/accounts/{account_id}",
    params(
        ("account_id" = i64, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account state", body = AccountData, content_type = "application/json"),
        (status = 400, description = "Malformed account_id"),
        (status = 404, description = "Account not found")
    ),
    tag = "Account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> ApiResult<AccountData> {
    let account_id = state.validator.account_path(&account_id)?;
    let account = state.engine.get_account(account_id).await?;
    ok(account.into())
}
