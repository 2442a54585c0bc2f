//! In-memory ledger store
//!
//! Mirrors the PostgreSQL store's observable behaviour:
//! - one tokio mutex per account ID stands in for `SELECT ... FOR UPDATE`,
//!   held until commit or rollback and bounded by the lock timeout;
//! - reads inside a transaction see the latest committed rows (read committed);
//! - `account_id` and `reference_id` uniqueness is checked on insert and again
//!   at commit, so a losing concurrent insert fails with the same errors.
//!
//! Writes are staged per transaction and applied in one step at commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use uuid::Uuid;

use super::error::{LedgerError, StorageError};
use super::store::{LedgerStore, LedgerTx};
use super::types::{
    Account, AccountId, IdempotencyKey, LedgerEntry, NewLedgerEntry, NewTransaction,
    SYSTEM_ACCOUNT_ID, TransactionRecord, to_scale,
};

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    transactions: HashMap<Uuid, TransactionRecord>,
    by_reference: HashMap<IdempotencyKey, Uuid>,
    entries: Vec<LedgerEntry>,
}

struct Inner {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<AccountId, Arc<RowLock<()>>>>,
    next_entry_id: AtomicI64,
    lock_timeout: Duration,
}

impl Inner {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, LedgerError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store poisoned".to_string()).into())
    }

    fn row_lock(&self, account_id: AccountId) -> Result<Arc<RowLock<()>>, LedgerError> {
        let mut locks = self
            .row_locks
            .lock()
            .map_err(|_| LedgerError::from(StorageError::Unavailable("lock table poisoned".to_string())))?;
        Ok(locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(RowLock::new(())))
            .clone())
    }
}

/// Process-local ledger store
#[derive(Clone)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                next_entry_id: AtomicI64::new(1),
                lock_timeout,
            }),
        }
    }

    /// Number of committed transactions
    pub fn transaction_count(&self) -> Result<usize, LedgerError> {
        Ok(self.inner.tables()?.transactions.len())
    }

    /// Number of committed ledger rows
    pub fn entry_count(&self) -> Result<usize, LedgerError> {
        Ok(self.inner.tables()?.entries.len())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        Ok(Box::new(MemoryTx {
            inner: self.inner.clone(),
            held: HashMap::new(),
            rows: BTreeMap::new(),
            inserted: Vec::new(),
            transactions: Vec::new(),
            entries: Vec::new(),
        }))
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.inner.tables()?.accounts.get(&account_id).cloned())
    }

    async fn find_transaction(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let tables = self.inner.tables()?;
        Ok(tables
            .by_reference
            .get(key)
            .and_then(|id| tables.transactions.get(id))
            .cloned())
    }

    async fn ledger_entries(&self, transaction_id: Uuid) -> Result<Vec<LedgerEntry>, LedgerError> {
        let tables = self.inner.tables()?;
        let mut rows: Vec<LedgerEntry> = tables
            .entries
            .iter()
            .filter(|e| e.transaction_id == transaction_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.id);
        Ok(rows)
    }

    async fn ledger_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        let tables = self.inner.tables()?;
        let sum = tables
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .map(|e| e.amount)
            .sum::<Decimal>();
        Ok(to_scale(sum))
    }

    async fn ensure_system_account(&self) -> Result<(), LedgerError> {
        let mut tables = self.inner.tables()?;
        tables.accounts.entry(SYSTEM_ACCOUNT_ID).or_insert_with(|| {
            let now = Utc::now();
            Account {
                account_id: SYSTEM_ACCOUNT_ID,
                balance: to_scale(Decimal::ZERO),
                created_at: now,
                updated_at: now,
            }
        });
        Ok(())
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        self.inner.tables().map(|_| ())
    }
}

struct MemoryTx {
    inner: Arc<Inner>,
    held: HashMap<AccountId, OwnedMutexGuard<()>>,
    /// Rows locked or inserted by this transaction, with staged values
    rows: BTreeMap<AccountId, Account>,
    inserted: Vec<AccountId>,
    transactions: Vec<TransactionRecord>,
    entries: Vec<LedgerEntry>,
}

impl MemoryTx {
    async fn acquire(&mut self, account_id: AccountId) -> Result<(), LedgerError> {
        if self.held.contains_key(&account_id) {
            return Ok(());
        }
        let lock = self.inner.row_lock(account_id)?;
        let guard = tokio::time::timeout(self.inner.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| LedgerError::from(StorageError::LockTimeout))?;
        self.held.insert(account_id, guard);
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn find_transaction_by_reference(
        &mut self,
        key: &IdempotencyKey,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        if let Some(own) = self.transactions.iter().find(|t| t.reference_id == *key) {
            return Ok(Some(own.clone()));
        }
        let tables = self.inner.tables()?;
        Ok(tables
            .by_reference
            .get(key)
            .and_then(|id| tables.transactions.get(id))
            .cloned())
    }

    async fn lock_account(&mut self, account_id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.acquire(account_id).await?;
        if let Some(row) = self.rows.get(&account_id) {
            return Ok(Some(row.clone()));
        }
        // Read after the lock is held so the latest committed balance is seen
        let committed = self.inner.tables()?.accounts.get(&account_id).cloned();
        if let Some(ref row) = committed {
            self.rows.insert(account_id, row.clone());
        }
        Ok(committed)
    }

    async fn insert_account(
        &mut self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<Account, LedgerError> {
        self.acquire(account_id).await?;
        let exists = self.rows.contains_key(&account_id)
            || self.inner.tables()?.accounts.contains_key(&account_id);
        if exists {
            return Err(LedgerError::DuplicateAccountId(account_id));
        }
        let now = Utc::now();
        let account = Account {
            account_id,
            balance: to_scale(balance),
            created_at: now,
            updated_at: now,
        };
        self.rows.insert(account_id, account.clone());
        self.inserted.push(account_id);
        Ok(account)
    }

    async fn update_balance(
        &mut self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), LedgerError> {
        let row = self.rows.get_mut(&account_id).ok_or_else(|| {
            LedgerError::from(StorageError::Integrity(format!(
                "account {} updated without holding its lock",
                account_id
            )))
        })?;
        row.balance = to_scale(balance);
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_transaction(
        &mut self,
        txn: &NewTransaction,
    ) -> Result<TransactionRecord, LedgerError> {
        let taken = self
            .transactions
            .iter()
            .any(|t| t.reference_id == txn.reference_id)
            || self
                .inner
                .tables()?
                .by_reference
                .contains_key(&txn.reference_id);
        if taken {
            return Err(LedgerError::Conflict(txn.reference_id));
        }
        let record = TransactionRecord {
            id: txn.id,
            source_account_id: txn.source_account_id,
            destination_account_id: txn.destination_account_id,
            amount: to_scale(txn.amount),
            reference_id: txn.reference_id,
            created_at: Utc::now(),
        };
        self.transactions.push(record.clone());
        Ok(record)
    }

    async fn insert_ledger_entries(
        &mut self,
        entries: &[NewLedgerEntry],
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let now = Utc::now();
        let rows: Vec<LedgerEntry> = entries
            .iter()
            .map(|e| LedgerEntry {
                id: self.inner.next_entry_id.fetch_add(1, Ordering::SeqCst),
                account_id: e.account_id,
                transaction_id: e.transaction_id,
                amount: to_scale(e.amount),
                entry_type: e.entry_type,
                created_at: now,
            })
            .collect();
        self.entries.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let this = *self;
        {
            let mut tables = this.inner.tables()?;

            // Verify everything first so a failed commit applies nothing
            for txn in &this.transactions {
                if tables.by_reference.contains_key(&txn.reference_id) {
                    return Err(LedgerError::Conflict(txn.reference_id));
                }
            }
            for id in &this.inserted {
                if tables.accounts.contains_key(id) {
                    return Err(LedgerError::DuplicateAccountId(*id));
                }
            }

            for (id, row) in this.rows {
                tables.accounts.insert(id, row);
            }
            for txn in this.transactions {
                tables.by_reference.insert(txn.reference_id, txn.id);
                tables.transactions.insert(txn.id, txn);
            }
            tables.entries.extend(this.entries);
        }
        // Row locks release here, after the new state is visible
        drop(this.held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::EntryType;

    fn store() -> MemoryLedgerStore {
        MemoryLedgerStore::new(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_ensure_system_account_is_idempotent() {
        let store = store();
        store.ensure_system_account().await.unwrap();
        store.ensure_system_account().await.unwrap();
        let system = store.get_account(SYSTEM_ACCOUNT_ID).await.unwrap().unwrap();
        assert_eq!(system.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_rows() {
        let store = store();
        let mut tx = store.begin().await.unwrap();
        tx.insert_account(AccountId(1), Decimal::from(5)).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(store.get_account(AccountId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_tx_releases_lock() {
        let store = store();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_account(AccountId(1), Decimal::ZERO).await.unwrap();
            tx.commit().await.unwrap();
        }
        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_account(AccountId(1)).await.unwrap();
            // dropped without commit
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_account(AccountId(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lock_wait_times_out() {
        let store = store();
        let mut first = store.begin().await.unwrap();
        first.insert_account(AccountId(3), Decimal::ZERO).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let err = second.lock_account(AccountId(3)).await.unwrap_err();
        assert_eq!(err, LedgerError::Storage(StorageError::LockTimeout));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_update_requires_lock() {
        let store = store();
        let mut tx = store.begin().await.unwrap();
        let err = tx.update_balance(AccountId(8), Decimal::ONE).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Storage(StorageError::Integrity(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_reference_conflicts_at_commit() {
        let store = store();
        let key = IdempotencyKey::from(Uuid::new_v4());
        let txn = |id| NewTransaction {
            id,
            source_account_id: AccountId(1),
            destination_account_id: AccountId(2),
            amount: Decimal::ONE,
            reference_id: key,
        };

        let mut a = store.begin().await.unwrap();
        let mut b = store.begin().await.unwrap();
        a.insert_transaction(&txn(Uuid::new_v4())).await.unwrap();
        b.insert_transaction(&txn(Uuid::new_v4())).await.unwrap();
        a.commit().await.unwrap();

        let err = b.commit().await.unwrap_err();
        assert_eq!(err, LedgerError::Conflict(key));
        assert_eq!(store.transaction_count().unwrap(), 1);
    }

    #[test]
    fn test_counts_surface_poisoned_tables() {
        let store = store();
        let inner = store.inner.clone();
        let _ = std::thread::spawn(move || {
            let _tables = inner.tables.lock().unwrap();
            panic!("writer died holding the tables");
        })
        .join();

        assert!(store.transaction_count().is_err());
        assert!(store.entry_count().is_err());
    }

    #[tokio::test]
    async fn test_entries_are_numbered_and_ordered() {
        let store = store();
        let txn_id = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();
        let rows = tx
            .insert_ledger_entries(&[
                NewLedgerEntry {
                    account_id: AccountId(1),
                    transaction_id: txn_id,
                    amount: Decimal::NEGATIVE_ONE,
                    entry_type: EntryType::Debit,
                },
                NewLedgerEntry {
                    account_id: AccountId(2),
                    transaction_id: txn_id,
                    amount: Decimal::ONE,
                    entry_type: EntryType::Credit,
                },
            ])
            .await
            .unwrap();
        assert!(rows[0].id < rows[1].id);
        tx.commit().await.unwrap();

        let committed = store.ledger_entries(txn_id).await.unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(committed[0].entry_type, EntryType::Debit);
        assert_eq!(store.ledger_balance(AccountId(2)).await.unwrap(), Decimal::ONE);
    }
}
