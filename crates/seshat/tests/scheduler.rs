//! Integration tests for the background tasks: autosave loop, leave
//! listener, and the load waiter they feed.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{FailKeyStore, PlayerData, fast_config, harness};
use seshat::{
    DataManager, InMemoryRegistry, Record, SaveSlot, SessionId, decode, spawn_autosave,
    spawn_leave_listener,
};
use seshat_store::DataStore;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_autosave_persists_cached_records() {
    let h = harness();
    let session = SessionId(42);
    h.registry.join(session);
    h.manager.new_save(session, SaveSlot(0)).await;

    let autosave = spawn_autosave(h.manager.clone());

    // autosave interval is 50ms; wait out a few ticks
    tokio::time::sleep(Duration::from_millis(180)).await;
    autosave.shutdown().await;

    let payload = h.store.get("42.0").await.unwrap().unwrap();
    let record: Record<PlayerData> = decode(&payload).unwrap();
    assert_eq!(record.owner(), session);
    assert_eq!(record.data(), &PlayerData::default());
}

#[tokio::test]
async fn test_autosave_isolates_failing_session() {
    let store = Arc::new(FailKeyStore::new("1.0"));
    let registry = Arc::new(InMemoryRegistry::new());
    let manager = DataManager::new(
        store.clone(),
        registry.clone(),
        PlayerData::default(),
        fast_config(),
    );

    registry.join(SessionId(1));
    registry.join(SessionId(2));
    manager.new_save(SessionId(1), SaveSlot(0)).await;
    manager.new_save(SessionId(2), SaveSlot(0)).await;

    let autosave = spawn_autosave(manager.clone());
    tokio::time::sleep(Duration::from_millis(180)).await;
    autosave.shutdown().await;

    // session 1's writes keep failing; session 2 is saved regardless
    assert!(store.get_raw("1.0").await.is_none());
    assert!(store.get_raw("2.0").await.is_some());
    // and the failing session's record is still cached for the next tick
    assert!(manager.contains(SessionId(1)).await);
}

#[tokio::test]
async fn test_leave_listener_runs_hook_then_final_saves() {
    let h = harness();
    let session = SessionId(3);
    h.registry.join(session);
    h.manager.new_save(session, SaveSlot(0)).await;
    h.manager
        .with_record_mut(session, |d| d.coins = 777)
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(None));
    let hook = {
        let seen = Arc::clone(&seen);
        Arc::new(move |record: &Record<PlayerData>| {
            *seen.lock().unwrap() = Some(record.data().coins);
        })
    };

    let (tx, rx) = mpsc::channel(8);
    let listener = spawn_leave_listener(h.manager.clone(), rx, Some(hook));

    h.registry.leave(session);
    tx.send(session).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(*seen.lock().unwrap(), Some(777));
    assert!(!h.manager.contains(session).await);

    let payload = h.store.get("3.0").await.unwrap().unwrap();
    let record: Record<PlayerData> = decode(&payload).unwrap();
    assert_eq!(record.data().coins, 777);

    drop(tx);
    listener.shutdown().await;
}

#[tokio::test]
async fn test_leave_listener_ignores_sessions_with_nothing_cached() {
    let h = harness();

    let (tx, rx) = mpsc::channel(8);
    let listener = spawn_leave_listener(h.manager.clone(), rx, None);

    // never loaded: the leave is a no-op, and the listener keeps running
    tx.send(SessionId(99)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.store.get("99.0").await.unwrap().is_none());

    let session = SessionId(4);
    h.registry.join(session);
    h.manager.new_save(session, SaveSlot(0)).await;
    h.registry.leave(session);
    tx.send(session).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.store.get("4.0").await.unwrap().is_some());

    drop(tx);
    listener.shutdown().await;
}

#[tokio::test]
async fn test_waiter_wakes_when_load_lands_late() {
    let h = harness();
    let session = SessionId(6);
    h.registry.join(session);

    // another subsystem needs the record before the load was even issued
    let waiter = {
        let manager = h.manager.clone();
        tokio::spawn(async move { manager.wait_for_data(session).await })
    };

    tokio::time::sleep(Duration::from_millis(40)).await;
    h.manager.new_save(session, SaveSlot(2)).await;

    let entry = waiter.await.unwrap().unwrap();
    assert_eq!(entry.record.owner(), session);
    assert_eq!(entry.save_slot, SaveSlot(2));
}

#[tokio::test]
async fn test_waiter_gives_up_when_session_leaves() {
    let h = harness();
    let session = SessionId(6);
    h.registry.join(session);

    let waiter = {
        let manager = h.manager.clone();
        tokio::spawn(async move { manager.wait_for_data(session).await })
    };

    tokio::time::sleep(Duration::from_millis(40)).await;
    h.registry.leave(session);

    // the waiter re-checks the registry each poll interval (20ms here)
    let result = tokio::time::timeout(Duration::from_millis(500), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_none());
}
