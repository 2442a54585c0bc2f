//! Axum extractors for strict request intake
//!
//! - `StrictJson<T>`: JSON body whose rejections use the API envelope
//! - `ReferenceId`: the required `referenceId` idempotency header

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::response::error_codes;
use crate::ledger::{IdempotencyGuard, IdempotencyKey};

/// Header carrying the client idempotency key
pub const REFERENCE_ID_HEADER: &str = "referenceid";

/// JSON body extractor that reports malformed bodies as `INVALID_PARAMETER`
#[derive(Debug)]
pub struct StrictJson<T>(pub T);

impl<S, T> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e.body_text())))?;
        Ok(StrictJson(value))
    }
}

/// Validated `referenceId` header
#[derive(Debug, Clone, Copy)]
pub struct ReferenceId(pub IdempotencyKey);

impl<S> FromRequestParts<S> for ReferenceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = match parts.headers.get(REFERENCE_ID_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| ApiError::bad_request("invalid referenceId format"))?,
            ),
            None => None,
        };

        IdempotencyGuard::key(raw).map(ReferenceId).map_err(|e| {
            let mut err = ApiError::from(e);
            if raw.is_none_or(|r| r.trim().is_empty()) {
                err.code = error_codes::MISSING_REFERENCE_ID;
            }
            err
        })
    }
}
