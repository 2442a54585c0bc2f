//! Account registry
//!
//! Locking reads always walk account IDs in ascending order, independent of
//! which side of the transfer an account is on, and only then map rows back
//! to their roles. Two transfers over the same pair in opposite directions
//! therefore request locks in the same order and cannot deadlock.

use rust_decimal::Decimal;

use super::error::{AccountSide, LedgerError};
use super::store::{LedgerStore, LedgerTx};
use super::types::{Account, AccountId};

/// Source and destination rows, locked for the enclosing transaction
#[derive(Debug, Clone)]
pub struct LockedPair {
    pub source: Account,
    pub destination: Account,
}

pub struct AccountRegistry;

impl AccountRegistry {
    /// Canonical lock order for a set of IDs: ascending, deduplicated.
    pub fn lock_order(ids: &[AccountId]) -> Vec<AccountId> {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();
        ordered
    }

    /// Lock both transfer accounts and re-associate them to their roles.
    pub async fn lock_pair(
        tx: &mut dyn LedgerTx,
        source: AccountId,
        destination: AccountId,
    ) -> Result<LockedPair, LedgerError> {
        let mut rows = Vec::with_capacity(2);
        for account_id in Self::lock_order(&[source, destination]) {
            if let Some(account) = tx.lock_account(account_id).await? {
                rows.push(account);
            }
        }

        let take = |rows: &[Account], id: AccountId, side: AccountSide| {
            rows.iter()
                .find(|a| a.account_id == id)
                .cloned()
                .ok_or(LedgerError::AccountNotFound {
                    side,
                    account_id: id,
                })
        };

        // Source is reported first when both are missing
        let source_row = take(&rows, source, AccountSide::Source)?;
        let destination_row = take(&rows, destination, AccountSide::Destination)?;

        Ok(LockedPair {
            source: source_row,
            destination: destination_row,
        })
    }

    /// Lock a single account that must exist.
    pub async fn lock_one(
        tx: &mut dyn LedgerTx,
        account_id: AccountId,
        side: AccountSide,
    ) -> Result<Account, LedgerError> {
        tx.lock_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound { side, account_id })
    }

    /// Create a new account row inside `tx`.
    pub async fn create(
        tx: &mut dyn LedgerTx,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<Account, LedgerError> {
        tx.insert_account(account_id, balance).await
    }

    /// Committed state of one account, without locking.
    pub async fn get(store: &dyn LedgerStore, account_id: AccountId) -> Result<Account, LedgerError> {
        store
            .get_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound {
                side: AccountSide::Lookup,
                account_id,
            })
    }
}
