//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use seshat::{DataManager, InMemoryRegistry, ManagerConfig};
use seshat_store::{DataStore, MemoryStore, StoreError};

/// Domain payload used across the integration tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub coins: u32,
    pub level: u32,
}

impl Default for PlayerData {
    fn default() -> Self {
        Self { coins: 100, level: 1 }
    }
}

/// Manager config with intervals tightened for test speed.
pub fn fast_config() -> ManagerConfig {
    ManagerConfig::new()
        .with_autosave_interval(Duration::from_millis(50))
        .with_drain_grace(Duration::from_millis(10))
        .with_drain_poll_interval(Duration::from_millis(10))
        .with_drain_max_wait(Duration::from_millis(1000))
        .with_waiter_poll_interval(Duration::from_millis(20))
        .with_save_retry_backoff(Duration::from_millis(5))
}

/// A manager wired to an in-memory store and registry.
pub struct Harness {
    pub manager: DataManager<PlayerData>,
    pub store: Arc<MemoryStore>,
    pub registry: Arc<InMemoryRegistry>,
}

pub fn harness() -> Harness {
    harness_with(fast_config())
}

pub fn harness_with(config: ManagerConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(InMemoryRegistry::new());
    let manager = DataManager::new(
        store.clone(),
        registry.clone(),
        PlayerData::default(),
        config,
    );
    Harness {
        manager,
        store,
        registry,
    }
}

/// Store wrapper that delays every write, keeping saves in flight long
/// enough for concurrency tests to observe them.
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }

    pub async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await.unwrap()
    }
}

#[async_trait]
impl DataStore for SlowStore {
    async fn get(&self, key: &str) -> seshat_store::Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> seshat_store::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value).await
    }
}

/// Store wrapper whose first `failures` writes fail, then recover.
pub struct FlakyStore {
    inner: MemoryStore,
    remaining: AtomicU32,
}

impl FlakyStore {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            remaining: AtomicU32::new(failures),
        }
    }

    pub async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await.unwrap()
    }
}

#[async_trait]
impl DataStore for FlakyStore {
    async fn get(&self, key: &str) -> seshat_store::Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> seshat_store::Result<()> {
        let remaining = self.remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        self.inner.set(key, value).await
    }
}

/// Store wrapper that rejects writes for one key and accepts the rest.
pub struct FailKeyStore {
    inner: MemoryStore,
    fail_key: String,
}

impl FailKeyStore {
    pub fn new(fail_key: impl Into<String>) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_key: fail_key.into(),
        }
    }

    pub async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await.unwrap()
    }
}

#[async_trait]
impl DataStore for FailKeyStore {
    async fn get(&self, key: &str) -> seshat_store::Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> seshat_store::Result<()> {
        if key == self.fail_key {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        self.inner.set(key, value).await
    }
}
