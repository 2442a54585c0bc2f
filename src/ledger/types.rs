//! Ledger domain types
//!
//! Accounts, transactions and ledger entries, plus the validated value types
//! (`AccountId`, `Amount`, `IdempotencyKey`) that every engine operation
//! receives. All money is `rust_decimal::Decimal` at a fixed scale of
//! [`AMOUNT_SCALE`] fractional digits; no floating point is involved.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::error::LedgerError;

/// Fractional digits carried by every stored amount (`NUMERIC(20,6)`).
pub const AMOUNT_SCALE: u32 = 6;

/// Integer digits available in `NUMERIC(20,6)`; magnitudes must stay below 10^14.
const AMOUNT_INTEGER_DIGITS: u32 = 14;

/// Reserved funding counterparty for account creation.
pub const SYSTEM_ACCOUNT_ID: AccountId = AccountId(0);

// ============================================================================
// AccountId
// ============================================================================

/// Business key of an account. `0` is the system account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    pub fn is_system(self) -> bool {
        self == SYSTEM_ACCOUNT_ID
    }

    /// Reject non-positive IDs for customer-facing operations.
    pub fn require_customer(self, field: &'static str) -> Result<Self, LedgerError> {
        if self.0 <= 0 {
            return Err(LedgerError::invalid(field, "must be greater than 0"));
        }
        Ok(self)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

// ============================================================================
// IdempotencyKey
// ============================================================================

/// Client-supplied request identifier, stored as `transactions.reference_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    pub const FIELD: &'static str = "referenceId";

    /// Parse a raw header value. Empty and non-UUID keys are client errors.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LedgerError::invalid(Self::FIELD, "missing idempotency key"));
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| LedgerError::invalid(Self::FIELD, "invalid referenceId format"))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for IdempotencyKey {
    fn from(v: Uuid) -> Self {
        Self(v)
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Amount
// ============================================================================

/// A validated fixed-point amount, always carried at scale 6.
///
/// Construction rejects (never rounds) values with more than six fractional
/// digits and values that would not fit the storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// Strictly positive amount (transfers).
    pub fn positive(value: Decimal, field: &'static str) -> Result<Self, LedgerError> {
        let amount = Self::checked(value, field)?;
        if amount.0 <= Decimal::ZERO {
            return Err(LedgerError::invalid(field, "must be greater than 0"));
        }
        Ok(amount)
    }

    /// Zero or positive amount (initial balances).
    pub fn non_negative(value: Decimal, field: &'static str) -> Result<Self, LedgerError> {
        let amount = Self::checked(value, field)?;
        if amount.0.is_sign_negative() && !amount.0.is_zero() {
            return Err(LedgerError::invalid(field, "cannot be negative"));
        }
        Ok(amount)
    }

    fn checked(value: Decimal, field: &'static str) -> Result<Self, LedgerError> {
        let normalized = value.normalize();
        if normalized.scale() > AMOUNT_SCALE {
            return Err(LedgerError::invalid(
                field,
                format!("at most {} fractional digits allowed", AMOUNT_SCALE),
            ));
        }
        if !fits_column(normalized) {
            return Err(LedgerError::invalid(field, "exceeds maximum supported amount"));
        }
        Ok(Self(to_scale(normalized)))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True when `value` fits `NUMERIC(20,6)` without rounding.
pub fn fits_column(value: Decimal) -> bool {
    let limit = Decimal::from(10i64.pow(AMOUNT_INTEGER_DIGITS));
    value.abs() < limit
}

/// Rescale to exactly six fractional digits. Callers guarantee the value
/// carries no more than six, so this only pads.
pub fn to_scale(value: Decimal) -> Decimal {
    let mut v = value;
    v.rescale(AMOUNT_SCALE);
    v
}

/// Render an amount with exactly six fractional digits.
pub fn format_amount(value: Decimal) -> String {
    to_scale(value).to_string()
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Account {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A committed movement between two accounts.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Decimal,
    pub reference_id: IdempotencyKey,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub account_id: AccountId,
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub entry_type: EntryType,
    pub created_at: DateTime<Utc>,
}

/// Transaction row about to be appended.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub id: Uuid,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    pub amount: Decimal,
    pub reference_id: IdempotencyKey,
}

/// Ledger row about to be appended.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub account_id: AccountId,
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub entry_type: EntryType,
}

impl NewLedgerEntry {
    /// The DEBIT/CREDIT pair for moving `amount` from `source` to `destination`.
    pub fn double_entry(txn: &NewTransaction) -> [NewLedgerEntry; 2] {
        [
            NewLedgerEntry {
                account_id: txn.source_account_id,
                transaction_id: txn.id,
                amount: -txn.amount,
                entry_type: EntryType::Debit,
            },
            NewLedgerEntry {
                account_id: txn.destination_account_id,
                transaction_id: txn.id,
                amount: txn.amount,
                entry_type: EntryType::Credit,
            },
        ]
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Whether an operation applied new effects or replayed a committed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Applied,
    AlreadyProcessed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub disposition: Disposition,
}

impl<T> Outcome<T> {
    pub fn applied(value: T) -> Self {
        Self {
            value,
            disposition: Disposition::Applied,
        }
    }

    pub fn already_processed(value: T) -> Self {
        Self {
            value,
            disposition: Disposition::AlreadyProcessed,
        }
    }

    pub fn is_replay(&self) -> bool {
        self.disposition == Disposition::AlreadyProcessed
    }
}
