//! Ledger error types
//!
//! Every engine failure maps to one of these variants. Errors raised inside
//! an engine transaction always roll the whole unit back, so callers never
//! observe a partially applied transfer.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{AccountId, IdempotencyKey};

/// Which role a missing account was requested in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSide {
    Source,
    Destination,
    /// Direct lookup, no transfer role
    Lookup,
}

impl fmt::Display for AccountSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountSide::Source => "Source account",
            AccountSide::Destination => "Destination account",
            AccountSide::Lookup => "Account",
        };
        f.write_str(s)
    }
}

/// Storage-level failures. Retryable ones are safe to resubmit with the same
/// idempotency key.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("timed out waiting for account lock")]
    LockTimeout,

    #[error("transaction aborted: {0}")]
    Aborted(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("ledger integrity violation: {0}")]
    Integrity(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::LockTimeout | StorageError::Aborted(_) | StorageError::Unavailable(_)
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("{side} {account_id} not found")]
    AccountNotFound {
        side: AccountSide,
        account_id: AccountId,
    },

    #[error("account_id {0} already exists")]
    DuplicateAccountId(AccountId),

    #[error("Insufficient balance in source account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// Unique-key race on `reference_id`; the engine resolves this into an
    /// already-processed outcome.
    #[error("referenceId {0} was committed by a concurrent request")]
    Conflict(IdempotencyKey),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidInput { .. } => "INVALID_INPUT",
            LedgerError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            LedgerError::DuplicateAccountId(_) => "DUPLICATE_ACCOUNT_ID",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::Conflict(_) => "CONFLICT",
            LedgerError::Storage(StorageError::LockTimeout) => "LOCK_TIMEOUT",
            LedgerError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    /// HTTP status suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidInput { .. }
            | LedgerError::DuplicateAccountId(_)
            | LedgerError::InsufficientFunds { .. } => 400,
            LedgerError::AccountNotFound {
                side: AccountSide::Lookup,
                ..
            } => 404,
            LedgerError::AccountNotFound { .. } => 400,
            LedgerError::Conflict(_) => 409,
            LedgerError::Storage(e) if e.is_retryable() => 503,
            LedgerError::Storage(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Storage(e) => e.is_retryable(),
            LedgerError::Conflict(_) => true,
            _ => false,
        }
    }
}
