//! Transfer engine
//!
//! Orchestrates one storage transaction per request:
//!
//! ```text
//! validate ─▶ begin ─▶ idempotency check ─▶ lock (ascending IDs)
//!          ─▶ idempotency re-check ─▶ solvency ─▶ mutate balances ─▶ append txn + DEBIT/CREDIT ─▶ commit
//! ```
//!
//! The re-check runs once the rows are held: a same-key request that queued
//! behind the winner's locks must answer with the winner's result, not with
//! the state the winner left behind.
//!
//! Any error after `begin` rolls back the whole unit. A unique-key race on
//! the idempotency key is resolved to the committed winner, so a retried
//! request takes effect at most once.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{AccountSide, LedgerError, StorageError};
use super::idempotency::IdempotencyGuard;
use super::registry::AccountRegistry;
use super::store::{LedgerStore, LedgerTx};
use super::types::{
    Account, AccountId, Amount, IdempotencyKey, NewLedgerEntry, NewTransaction, Outcome,
    SYSTEM_ACCOUNT_ID, TransactionRecord, fits_column,
};

/// Balance of an account next to the sum of its ledger rows
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub ledger_sum: Decimal,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_sum
    }
}

/// Result of the in-transaction part of account creation
enum Creation {
    Created(Account),
    Replayed(TransactionRecord),
}

#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    // ========================================================================
    // transfer
    // ========================================================================

    /// Move `amount` from `source` to `destination` exactly once per key.
    pub async fn transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        idempotency_key: &str,
    ) -> Result<Outcome<TransactionRecord>, LedgerError> {
        let key = IdempotencyKey::parse(idempotency_key)?;
        let source = source.require_customer("source_account_id")?;
        let destination = destination.require_customer("destination_account_id")?;
        if source == destination {
            return Err(LedgerError::invalid(
                "destination_account_id",
                "cannot be the same as source_account_id",
            ));
        }
        let amount = Amount::positive(amount, "amount")?;

        let mut tx = self.store.begin().await?;
        let result = Self::apply_transfer(tx.as_mut(), source, destination, amount, key).await;

        match Self::finish(tx, result).await {
            Ok(outcome) => {
                info!(
                    transaction_id = %outcome.value.id,
                    reference_id = %key,
                    source = %source,
                    destination = %destination,
                    amount = %amount,
                    replay = outcome.is_replay(),
                    "Transfer completed"
                );
                Ok(outcome)
            }
            Err(LedgerError::Conflict(key)) => {
                let txn = IdempotencyGuard::resolve_conflict(self.store(), &key).await?;
                Ok(Outcome::already_processed(txn))
            }
            Err(e) => {
                Self::log_failure("Transfer", &key, &e);
                Err(e)
            }
        }
    }

    async fn apply_transfer(
        tx: &mut dyn LedgerTx,
        source: AccountId,
        destination: AccountId,
        amount: Amount,
        key: IdempotencyKey,
    ) -> Result<Outcome<TransactionRecord>, LedgerError> {
        if let Some(prior) = IdempotencyGuard::check(tx, &key).await? {
            return Ok(Outcome::already_processed(prior));
        }

        let pair = AccountRegistry::lock_pair(tx, source, destination).await?;
        if let Some(prior) = IdempotencyGuard::check(tx, &key).await? {
            return Ok(Outcome::already_processed(prior));
        }

        let amount = amount.value();
        if pair.source.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: source,
                balance: pair.source.balance,
                requested: amount,
            });
        }

        let source_balance = pair.source.balance - amount;
        let destination_balance = pair.destination.balance + amount;
        if !fits_column(destination_balance) {
            return Err(LedgerError::invalid(
                "amount",
                "would exceed the maximum balance of the destination account",
            ));
        }

        tx.update_balance(source, source_balance).await?;
        tx.update_balance(destination, destination_balance).await?;

        let txn = NewTransaction {
            id: Uuid::new_v4(),
            source_account_id: source,
            destination_account_id: destination,
            amount,
            reference_id: key,
        };
        let record = tx.insert_transaction(&txn).await?;
        tx.insert_ledger_entries(&NewLedgerEntry::double_entry(&txn))
            .await?;

        Ok(Outcome::applied(record))
    }

    // ========================================================================
    // create_account
    // ========================================================================

    /// Create `account_id` funded with `initial_balance` from the system
    /// account.
    pub async fn create_account(
        &self,
        account_id: AccountId,
        initial_balance: Decimal,
        idempotency_key: &str,
    ) -> Result<Outcome<Account>, LedgerError> {
        let key = IdempotencyKey::parse(idempotency_key)?;
        let account_id = account_id.require_customer("account_id")?;
        let initial_balance = Amount::non_negative(initial_balance, "initial_balance")?;

        let mut tx = self.store.begin().await?;
        let result = Self::apply_create(tx.as_mut(), account_id, initial_balance, key).await;

        match Self::finish(tx, result).await {
            Ok(Creation::Created(account)) => {
                info!(
                    account_id = %account.account_id,
                    reference_id = %key,
                    initial_balance = %initial_balance,
                    "Account created"
                );
                Ok(Outcome::applied(account))
            }
            Ok(Creation::Replayed(prior)) => self.replayed_account(&prior, account_id).await,
            Err(LedgerError::Conflict(key)) => {
                let prior = IdempotencyGuard::resolve_conflict(self.store(), &key).await?;
                self.replayed_account(&prior, account_id).await
            }
            Err(LedgerError::DuplicateAccountId(id)) => {
                // A concurrent retry of this very request may have won the insert
                match self.store.find_transaction(&key).await? {
                    Some(prior) if Self::is_creation_of(&prior, id) => {
                        self.replayed_account(&prior, id).await
                    }
                    _ => {
                        debug!(account_id = %id, reference_id = %key, "Duplicate account_id rejected");
                        Err(LedgerError::DuplicateAccountId(id))
                    }
                }
            }
            Err(e) => {
                Self::log_failure("Account creation", &key, &e);
                Err(e)
            }
        }
    }

    async fn apply_create(
        tx: &mut dyn LedgerTx,
        account_id: AccountId,
        initial_balance: Amount,
        key: IdempotencyKey,
    ) -> Result<Creation, LedgerError> {
        if let Some(prior) = IdempotencyGuard::check(tx, &key).await? {
            return Ok(Creation::Replayed(prior));
        }

        // ID 0 sorts before every customer account, so taking it first keeps
        // the ascending lock order.
        let system = AccountRegistry::lock_one(tx, SYSTEM_ACCOUNT_ID, AccountSide::Source)
            .await
            .map_err(|e| match e {
                LedgerError::AccountNotFound { .. } => {
                    StorageError::Integrity("system account 0 is not seeded".to_string()).into()
                }
                other => other,
            })?;
        // Creations serialize on the system row; a same-key twin that waited
        // here has already committed.
        if let Some(prior) = IdempotencyGuard::check(tx, &key).await? {
            return Ok(Creation::Replayed(prior));
        }

        let mut account = AccountRegistry::create(tx, account_id, Decimal::ZERO).await?;

        // The system account is exempt from the solvency check
        let amount = initial_balance.value();
        let system_balance = system.balance - amount;
        if !fits_column(system_balance) {
            return Err(LedgerError::invalid(
                "initial_balance",
                "exceeds the funding capacity of the system account",
            ));
        }

        tx.update_balance(SYSTEM_ACCOUNT_ID, system_balance).await?;
        tx.update_balance(account_id, amount).await?;

        let txn = NewTransaction {
            id: Uuid::new_v4(),
            source_account_id: SYSTEM_ACCOUNT_ID,
            destination_account_id: account_id,
            amount,
            reference_id: key,
        };
        tx.insert_transaction(&txn).await?;
        tx.insert_ledger_entries(&NewLedgerEntry::double_entry(&txn))
            .await?;

        account.balance = amount;
        Ok(Creation::Created(account))
    }

    fn is_creation_of(prior: &TransactionRecord, account_id: AccountId) -> bool {
        prior.source_account_id.is_system() && prior.destination_account_id == account_id
    }

    /// Answer a creation replay, provided the key funded this very account.
    async fn replayed_account(
        &self,
        prior: &TransactionRecord,
        account_id: AccountId,
    ) -> Result<Outcome<Account>, LedgerError> {
        if !Self::is_creation_of(prior, account_id) {
            debug!(
                account_id = %account_id,
                reference_id = %prior.reference_id,
                transaction_id = %prior.id,
                "referenceId reused for a different request"
            );
            return Err(LedgerError::invalid(
                IdempotencyKey::FIELD,
                "already used for a different request",
            ));
        }
        let account = AccountRegistry::get(self.store(), account_id).await?;
        info!(
            account_id = %account.account_id,
            reference_id = %prior.reference_id,
            "Account creation already processed"
        );
        Ok(Outcome::already_processed(account))
    }

    // ========================================================================
    // reads
    // ========================================================================

    /// Committed state of one account.
    pub async fn get_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        if account_id.0 < 0 {
            return Err(LedgerError::invalid("account_id", "must not be negative"));
        }
        AccountRegistry::get(self.store(), account_id).await
    }

    /// Compare an account's balance with the sum of its ledger rows.
    pub async fn reconcile(&self, account_id: AccountId) -> Result<Reconciliation, LedgerError> {
        let account = self.get_account(account_id).await?;
        let ledger_sum = self.store.ledger_balance(account_id).await?;
        Ok(Reconciliation {
            account_id,
            balance: account.balance,
            ledger_sum,
        })
    }

    // ========================================================================
    // helpers
    // ========================================================================

    /// Commit on success, roll back on failure.
    async fn finish<T>(
        tx: Box<dyn LedgerTx>,
        result: Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    fn log_failure(operation: &str, key: &IdempotencyKey, err: &LedgerError) {
        match err {
            LedgerError::Storage(e) => warn!(
                reference_id = %key,
                retryable = e.is_retryable(),
                error = %e,
                "{} failed in storage", operation
            ),
            _ => debug!(reference_id = %key, error = %err, "{} rejected", operation),
        }
    }
}
