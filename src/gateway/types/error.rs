//! Gateway error type
//!
//! Every failure leaves the gateway as an `ApiResponse` envelope with a
//! numeric code and an HTTP status derived from the ledger error.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::response::{ApiResponse, error_codes};
use crate::ledger::{LedgerError, StorageError};

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

/// Handler result: status plus success envelope, or an `ApiError`
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 OK with `data`
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 Created with `data`
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    pub fn into_err<T>(self) -> Result<T, Self> {
        Err(self)
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match &e {
            LedgerError::InvalidInput { .. } => error_codes::INVALID_PARAMETER,
            LedgerError::AccountNotFound { .. } => error_codes::ACCOUNT_NOT_FOUND,
            LedgerError::DuplicateAccountId(_) => error_codes::DUPLICATE_ACCOUNT,
            LedgerError::InsufficientFunds { .. } => error_codes::INSUFFICIENT_BALANCE,
            LedgerError::Conflict(_) => error_codes::IDEMPOTENCY_CONFLICT,
            LedgerError::Storage(StorageError::LockTimeout) => error_codes::LOCK_TIMEOUT,
            LedgerError::Storage(s) if s.is_retryable() => error_codes::SERVICE_UNAVAILABLE,
            LedgerError::Storage(_) => error_codes::INTERNAL_ERROR,
        };
        let msg = match &e {
            LedgerError::Storage(StorageError::Integrity(detail)) => {
                tracing::error!(detail = %detail, "Ledger integrity failure");
                "internal error".to_string()
            }
            LedgerError::Storage(s) if s.is_retryable() => {
                format!("{}, retry with the same referenceId", s)
            }
            other => other.to_string(),
        };
        Self { status, code, msg }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, code = self.code, msg = %self.msg, "Request failed");
        }
        let body = Json(ApiResponse::<()>::error(self.code, self.msg));
        (self.status, body).into_response()
    }
}
