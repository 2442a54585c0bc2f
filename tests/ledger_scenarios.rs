use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;
use uuid::Uuid;

use ledger_engine::ledger::{
    AccountId, Disposition, LedgerError, LedgerStore, MemoryLedgerStore, SYSTEM_ACCOUNT_ID,
    TransferEngine,
};

/// Engine over a seeded in-memory store
async fn engine_with_store() -> (TransferEngine, MemoryLedgerStore) {
    let store = MemoryLedgerStore::new(Duration::from_secs(5));
    store.ensure_system_account().await.unwrap();
    (TransferEngine::new(Arc::new(store.clone())), store)
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn key() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::test]
async fn qa_walkthrough_k1_k2_k3() {
    let (engine, store) = engine_with_store().await;
    let (k1, k2, k3) = (key(), key(), key());

    engine
        .create_account(AccountId(1), dec("100"), &k1)
        .await
        .unwrap();
    engine
        .create_account(AccountId(2), dec("0"), &k2)
        .await
        .unwrap();

    let t1 = engine
        .transfer(AccountId(1), AccountId(2), dec("40"), &k3)
        .await
        .unwrap();
    let t2 = engine
        .transfer(AccountId(1), AccountId(2), dec("40"), &k3)
        .await
        .unwrap();

    assert_eq!(t1.disposition, Disposition::Applied);
    assert_eq!(t2.disposition, Disposition::AlreadyProcessed);
    assert_eq!(t1.value.id, t2.value.id);

    let a1 = engine.get_account(AccountId(1)).await.unwrap();
    let a2 = engine.get_account(AccountId(2)).await.unwrap();
    let sys = engine.get_account(SYSTEM_ACCOUNT_ID).await.unwrap();
    assert_eq!(a1.balance, dec("60"));
    assert_eq!(a2.balance, dec("40"));
    assert_eq!(sys.balance, dec("-100"));
    assert_eq!(store.transaction_count().unwrap(), 3);

    // k1 replay returns the account as it is now
    let replay = engine
        .create_account(AccountId(1), dec("100"), &k1)
        .await
        .unwrap();
    assert!(replay.is_replay());
    assert_eq!(replay.value.balance, dec("60"));
}

#[tokio::test]
async fn qa_overdraft_rejected_without_side_effects() {
    let (engine, store) = engine_with_store().await;
    engine
        .create_account(AccountId(1), dec("60"), &key())
        .await
        .unwrap();
    engine
        .create_account(AccountId(2), dec("40"), &key())
        .await
        .unwrap();
    let entries_before = store.entry_count().unwrap();

    let err = engine
        .transfer(AccountId(1), AccountId(2), dec("100"), &key())
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(store.entry_count().unwrap(), entries_before);
    assert_eq!(
        engine.get_account(AccountId(1)).await.unwrap().balance,
        dec("60")
    );
    assert_eq!(
        engine.get_account(AccountId(2)).await.unwrap().balance,
        dec("40")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn qa_ring_of_transfers_conserves_total() {
    let (engine, _store) = engine_with_store().await;
    let ids: Vec<i64> = (1..=6).collect();
    for id in &ids {
        engine
            .create_account(AccountId(*id), dec("100.123456"), &key())
            .await
            .unwrap();
    }

    // Each account sends to its neighbour in both directions
    let futures = (0..120).map(|i| {
        let engine = engine.clone();
        let from = ids[i % ids.len()];
        let to = if i % 2 == 0 {
            ids[(i + 1) % ids.len()]
        } else {
            ids[(i + ids.len() - 1) % ids.len()]
        };
        tokio::spawn(async move {
            engine
                .transfer(AccountId(from), AccountId(to), dec("0.5"), &key())
                .await
        })
    });

    for result in join_all(futures).await {
        result.unwrap().unwrap();
    }

    let mut total = Decimal::ZERO;
    for id in &ids {
        let account = engine.get_account(AccountId(*id)).await.unwrap();
        assert!(account.balance >= Decimal::ZERO);
        total += account.balance;
        assert!(engine.reconcile(AccountId(*id)).await.unwrap().is_consistent());
    }
    assert_eq!(total, dec("100.123456") * Decimal::from(6));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn qa_retry_storm_on_single_key() {
    let (engine, store) = engine_with_store().await;
    engine
        .create_account(AccountId(10), dec("1"), &key())
        .await
        .unwrap();
    engine
        .create_account(AccountId(11), dec("0"), &key())
        .await
        .unwrap();
    let k = key();

    let futures = (0..32).map(|_| {
        let engine = engine.clone();
        let k = k.clone();
        tokio::spawn(async move {
            engine
                .transfer(AccountId(10), AccountId(11), dec("1"), &k)
                .await
        })
    });
    let results: Vec<_> = join_all(futures)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let applied = results.iter().filter(|o| !o.is_replay()).count();
    assert_eq!(applied, 1);
    assert!(results.iter().all(|o| o.value.id == results[0].value.id));
    // Two creations plus the single transfer
    assert_eq!(store.transaction_count().unwrap(), 3);
    assert_eq!(
        engine.get_account(AccountId(11)).await.unwrap().balance,
        dec("1")
    );
}
