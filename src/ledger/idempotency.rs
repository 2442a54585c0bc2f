//! Idempotency guard
//!
//! A committed `TransactionRecord` is the only proof that a request already
//! took effect. The guard looks the key up inside the caller's transaction;
//! the storage unique constraint on `reference_id` catches whatever races
//! slip past that read.

use tracing::{debug, warn};

use super::error::{LedgerError, StorageError};
use super::store::{LedgerStore, LedgerTx};
use super::types::{IdempotencyKey, TransactionRecord};

pub struct IdempotencyGuard;

impl IdempotencyGuard {
    /// Validate a raw key before any storage access.
    pub fn key(raw: Option<&str>) -> Result<IdempotencyKey, LedgerError> {
        match raw {
            Some(raw) => IdempotencyKey::parse(raw),
            None => Err(LedgerError::invalid(
                IdempotencyKey::FIELD,
                "missing idempotency key",
            )),
        }
    }

    /// Prior transaction committed under `key`, read inside `tx`.
    pub async fn check(
        tx: &mut dyn LedgerTx,
        key: &IdempotencyKey,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let prior = tx.find_transaction_by_reference(key).await?;
        if let Some(ref txn) = prior {
            debug!(
                reference_id = %key,
                transaction_id = %txn.id,
                "Idempotency hit, skipping execution"
            );
        }
        Ok(prior)
    }

    /// Resolve a unique-key race after the losing transaction rolled back.
    ///
    /// The winner has committed by the time the constraint fires, so the
    /// record must be readable. If it is not, the race is reported as a
    /// retryable abort.
    pub async fn resolve_conflict(
        store: &dyn LedgerStore,
        key: &IdempotencyKey,
    ) -> Result<TransactionRecord, LedgerError> {
        match store.find_transaction(key).await? {
            Some(txn) => {
                debug!(
                    reference_id = %key,
                    transaction_id = %txn.id,
                    "Concurrent duplicate resolved to committed transaction"
                );
                Ok(txn)
            }
            None => {
                warn!(reference_id = %key, "Unique conflict without a visible winner");
                Err(StorageError::Aborted(format!(
                    "referenceId {} conflicted but no committed transaction was found",
                    key
                ))
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_requires_header() {
        let err = IdempotencyGuard::key(None).unwrap_err();
        assert_eq!(
            err,
            LedgerError::invalid("referenceId", "missing idempotency key")
        );
        assert!(IdempotencyGuard::key(Some("")).is_err());
    }

    #[test]
    fn test_key_rejects_malformed() {
        let err = IdempotencyGuard::key(Some("not-a-uuid")).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_key_accepts_uuid() {
        let key = IdempotencyGuard::key(Some("0b8e7d3c-1f4a-4c2b-9e6d-5a7b8c9d0e1f")).unwrap();
        assert_eq!(key.to_string(), "0b8e7d3c-1f4a-4c2b-9e6d-5a7b8c9d0e1f");
    }
}
