//! Ledger storage seam
//!
//! The engine only needs atomic multi-statement transactions, exclusive
//! row locks taken on read, and uniqueness on `account_id` and
//! `reference_id`. Both the PostgreSQL and in-memory stores implement these
//! traits with the same observable semantics.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::types::{
    Account, AccountId, IdempotencyKey, LedgerEntry, NewLedgerEntry, NewTransaction,
    TransactionRecord,
};

/// Entry point into a ledger store
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Store name for logging
    fn name(&self) -> &'static str;

    /// Open a new atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError>;

    /// Non-locking read of the committed account row.
    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Non-locking read of a committed transaction by idempotency key.
    async fn find_transaction(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<TransactionRecord>, LedgerError>;

    /// Ledger rows of one transaction, debit first.
    async fn ledger_entries(&self, transaction_id: Uuid) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Sum of all ledger rows for an account.
    async fn ledger_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError>;

    /// Insert the system account with a zero balance unless it already exists.
    async fn ensure_system_account(&self) -> Result<(), LedgerError>;

    async fn health_check(&self) -> Result<(), LedgerError>;
}

/// One open storage transaction.
///
/// Dropping without [`commit`](LedgerTx::commit) discards every write.
/// Locks taken by [`lock_account`](LedgerTx::lock_account) are held until
/// commit or rollback.
#[async_trait]
pub trait LedgerTx: Send {
    async fn find_transaction_by_reference(
        &mut self,
        key: &IdempotencyKey,
    ) -> Result<Option<TransactionRecord>, LedgerError>;

    /// Exclusive locking read of one account row. Blocks while another
    /// transaction holds the lock, up to the store's lock timeout.
    async fn lock_account(&mut self, account_id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Insert a new account row. An existing row yields `DuplicateAccountId`.
    async fn insert_account(
        &mut self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<Account, LedgerError>;

    /// Overwrite the balance of an account locked by this transaction.
    async fn update_balance(
        &mut self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), LedgerError>;

    /// Append a transaction row. A taken `reference_id` yields `Conflict`.
    async fn insert_transaction(
        &mut self,
        txn: &NewTransaction,
    ) -> Result<TransactionRecord, LedgerError>;

    async fn insert_ledger_entries(
        &mut self,
        entries: &[NewLedgerEntry],
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}
