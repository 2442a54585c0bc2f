//! Request validation rules
//!
//! Business checks on decoded bodies before they reach the engine. The rules
//! live in a plain value held by `AppState`, so tests can build their own.
//! The engine repeats the same checks and stays authoritative.

use rust_decimal::Decimal;

use super::types::{ApiError, CreateAccountRequest, CreateTransactionRequest};
use crate::ledger::{AMOUNT_SCALE, AccountId, LedgerError};

/// Account creation that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedCreateAccount {
    pub account_id: AccountId,
    pub initial_balance: Decimal,
}

/// Transfer that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedTransfer {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct RequestValidator {
    /// Maximum fractional digits accepted in amounts
    pub max_scale: u32,
    /// Exclusive upper bound on amount magnitude
    pub max_amount: Decimal,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self {
            max_scale: AMOUNT_SCALE,
            max_amount: Decimal::from(100_000_000_000_000i64),
        }
    }
}

impl RequestValidator {
    pub fn create_account(
        &self,
        req: &CreateAccountRequest,
    ) -> Result<ValidatedCreateAccount, ApiError> {
        let account_id = Self::account_id(req.account_id, "account_id")?;
        let initial_balance = req.initial_balance.inner();
        if initial_balance.is_sign_negative() && !initial_balance.is_zero() {
            return Err(invalid("initial_balance", "cannot be negative"));
        }
        self.amount_bounds(initial_balance, "initial_balance")?;

        Ok(ValidatedCreateAccount {
            account_id,
            initial_balance,
        })
    }

    pub fn transfer(&self, req: &CreateTransactionRequest) -> Result<ValidatedTransfer, ApiError> {
        let source = Self::account_id(req.source_account_id, "source_account_id")?;
        let destination = Self::account_id(req.destination_account_id, "destination_account_id")?;
        if source == destination {
            return Err(invalid(
                "destination_account_id",
                "cannot be the same as source_account_id",
            ));
        }

        let amount = req.amount.inner();
        if amount <= Decimal::ZERO {
            return Err(invalid("amount", "must be greater than 0"));
        }
        self.amount_bounds(amount, "amount")?;

        Ok(ValidatedTransfer {
            source,
            destination,
            amount,
        })
    }

    /// Path segment of `GET /api/accounts/{account_id}`
    pub fn account_path(&self, raw: &str) -> Result<AccountId, ApiError> {
        let id: i64 = raw
            .parse()
            .map_err(|_| invalid("account_id", "must be an integer"))?;
        if id < 0 {
            return Err(invalid("account_id", "must not be negative"));
        }
        Ok(AccountId(id))
    }

    fn account_id(raw: i64, field: &'static str) -> Result<AccountId, ApiError> {
        AccountId(raw).require_customer(field).map_err(ApiError::from)
    }

    fn amount_bounds(&self, value: Decimal, field: &'static str) -> Result<(), ApiError> {
        if value.normalize().scale() > self.max_scale {
            return Err(invalid(
                field,
                format!("at most {} fractional digits allowed", self.max_scale),
            ));
        }
        if value.abs() >= self.max_amount {
            return Err(invalid(field, "exceeds maximum supported amount"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ApiError {
    ApiError::from(LedgerError::invalid(field, reason))
}
