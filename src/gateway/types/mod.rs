//! Gateway types module
//!
//! ## Input Types
//! - [`StrictDecimal`]: Format-validated decimal for API input
//! - [`CreateAccountRequest`], [`CreateTransactionRequest`]: strict bodies
//! - [`StrictJson`], [`ReferenceId`]: Axum extractors
//!
//! ## Output Types
//! - [`DisplayAmount`]: Scale-6 formatted amount for API responses
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: Error envelope with HTTP status

pub mod error;
pub mod extract;
pub mod money;
pub mod request;
pub mod response;

// Re-export commonly used types at module root
pub use error::{ApiError, ApiResult, created, ok};
pub use extract::{REFERENCE_ID_HEADER, ReferenceId, StrictJson};
pub use money::{DisplayAmount, StrictDecimal};
pub use request::{CreateAccountRequest, CreateTransactionRequest};
pub use response::{AccountData, ApiResponse, HealthData, TransactionData, error_codes};
