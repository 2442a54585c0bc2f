//! Double-entry ledger
//!
//! Accounts hold a balance; every balance change is recorded as one
//! transaction row plus a DEBIT/CREDIT pair of ledger entries that sum to
//! zero. Account 0 is the system account that funds new accounts and may go
//! negative.
//!
//! # Safety Invariants
//!
//! 1. **All-or-nothing**: balances, transaction and entries commit together
//! 2. **Ascending locks**: account rows are always locked in ascending ID order
//! 3. **At-most-once**: a `referenceId` maps to at most one committed transaction
//! 4. **Solvency**: customer balances never go below zero
//!
//! # Stores
//!
//! - [`PgLedgerStore`]: PostgreSQL, `FOR UPDATE` row locks with `lock_timeout`
//! - [`MemoryLedgerStore`]: in-process tables with per-row async locks

pub mod engine;
pub mod error;
pub mod idempotency;
pub mod memory;
pub mod postgres;
pub mod registry;
pub mod store;
pub mod types;


// Re-exports for convenience
pub use engine::{Reconciliation, TransferEngine};
pub use error::{AccountSide, LedgerError, StorageError};
pub use idempotency::IdempotencyGuard;
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use registry::AccountRegistry;
pub use store::{LedgerStore, LedgerTx};
pub use types::{
    AMOUNT_SCALE, Account, AccountId, Amount, Disposition, EntryType, IdempotencyKey,
    LedgerEntry, Outcome, SYSTEM_ACCOUNT_ID, TransactionRecord, format_amount,
};
