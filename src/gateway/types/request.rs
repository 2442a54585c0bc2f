//! Request bodies
//!
//! Bodies are strict: unknown fields are rejected and amounts must be JSON
//! strings (see [`StrictDecimal`]).

use serde::Deserialize;
use utoipa::ToSchema;

use super::money::StrictDecimal;

/// POST /api/accounts
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateAccountRequest {
    #[schema(example = 1)]
    pub account_id: i64,
    /// Opening balance funded by the system account
    #[schema(value_type = String, example = "100.00")]
    pub initial_balance: StrictDecimal,
}

/// POST /api/transactions
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTransactionRequest {
    #[schema(example = 1)]
    pub source_account_id: i64,
    #[schema(example = 2)]
    pub destination_account_id: i64,
    #[schema(value_type = String, example = "40.00")]
    pub amount: StrictDecimal,
}
