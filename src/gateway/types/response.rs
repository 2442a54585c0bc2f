//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `error_codes`: Standard error code constants
//! - Account and transaction response DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::DisplayAmount;
use crate::ledger::{Account, Disposition, TransactionRecord};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or absent (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Account state
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountData {
    #[schema(example = 1)]
    pub account_id: i64,
    /// Balance with six fractional digits
    #[schema(value_type = String, example = "60.000000")]
    pub balance: DisplayAmount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountData {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id.0,
            balance: account.balance.into(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// A committed transfer
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionData {
    pub transaction_id: Uuid,
    #[schema(example = 1)]
    pub source_account_id: i64,
    #[schema(example = 2)]
    pub destination_account_id: i64,
    #[schema(value_type = String, example = "40.000000")]
    pub amount: DisplayAmount,
    /// Idempotency key the transfer was committed under
    #[serde(rename = "referenceId")]
    pub reference_id: Uuid,
    /// `APPLIED` for a new transfer, `ALREADY_PROCESSED` for a replay
    #[schema(value_type = String, example = "APPLIED")]
    pub status: Disposition,
    pub created_at: DateTime<Utc>,
}

impl TransactionData {
    pub fn new(txn: TransactionRecord, status: Disposition) -> Self {
        Self {
            transaction_id: txn.id,
            source_account_id: txn.source_account_id.0,
            destination_account_id: txn.destination_account_id.0,
            amount: txn.amount.into(),
            reference_id: txn.reference_id.as_uuid(),
            status,
            created_at: txn.created_at,
        }
    }
}

/// Health check response data
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    #[schema(example = "postgres")]
    pub storage: String,
    /// Build revision the binary was compiled from
    #[schema(example = "3f2a9c1")]
    pub build: String,
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const DUPLICATE_ACCOUNT: i32 = 1003;
    pub const MISSING_REFERENCE_ID: i32 = 1004;

    // Resource errors (4xxx)
    pub const ACCOUNT_NOT_FOUND: i32 = 4001;
    pub const IDEMPOTENCY_CONFLICT: i32 = 4009;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const LOCK_TIMEOUT: i32 = 5002;
}
