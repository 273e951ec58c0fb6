//! Load/save coordination between the record cache and the durable store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use seshat_store::SharedStore;

use crate::cache::{CacheEntry, RecordCache};
use crate::codec;
use crate::config::ManagerConfig;
use crate::error::{Error, Result};
use crate::record::{Record, SaveSlot, SessionId, store_key};
use crate::registry::SharedRegistry;

/// Outcome of a load attempt.
#[derive(Debug)]
pub enum LoadOutcome {
    /// A record was found, passed the ownership check, and is now cached.
    Loaded,

    /// No payload exists under the session's key. Cache untouched.
    Absent,

    /// A payload exists but does not decode as a record. Cache untouched;
    /// the caller decides whether to treat this as a first-time session.
    Malformed(serde_json::Error),
}

/// Observable lifecycle state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No record cached for the session.
    Unloaded,

    /// A record is cached.
    Loaded,

    /// A final save is in flight; the entry is already evicted.
    Saving,
}

/// Manager counters for monitoring.
#[derive(Debug, Clone)]
pub struct ManagerStats {
    /// Sessions with a cached record.
    pub loaded: usize,

    /// Final saves currently in flight.
    pub pending: usize,
}

/// Inner state shared by all manager handles.
struct ManagerInner<D> {
    store: SharedStore,
    registry: SharedRegistry,
    default_data: D,
    config: ManagerConfig,
    cache: RecordCache<D>,

    /// Per-session write locks serializing save against final save.
    save_locks: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,

    /// Sessions whose final save has not finished yet. Gates [`drain`].
    ///
    /// [`drain`]: DataManager::drain
    pending: Mutex<HashSet<SessionId>>,

    /// Signaled when a record lands in the cache.
    loaded: Notify,

    /// Signaled when a pending final save finishes.
    drained: Notify,
}

/// Coordinates per-session records between the in-memory cache and the
/// durable store.
///
/// One instance serves the whole process:
/// - [`load`]/[`new_save`] bring a session's record into the cache
/// - [`save`]/[`final_save`]/[`save_all`] mirror cached records to the
///   store, serialized per session so overlapping writes never interleave
/// - [`wait_for_data`] blocks a caller until a record arrives or the
///   session ends
/// - [`drain`] holds shutdown until in-flight final saves finish
///
/// Handles are cheap clones sharing one inner state.
///
/// [`load`]: DataManager::load
/// [`new_save`]: DataManager::new_save
/// [`save`]: DataManager::save
/// [`final_save`]: DataManager::final_save
/// [`save_all`]: DataManager::save_all
/// [`wait_for_data`]: DataManager::wait_for_data
/// [`drain`]: DataManager::drain
pub struct DataManager<D> {
    inner: Arc<ManagerInner<D>>,
}

impl<D> DataManager<D>
where
    D: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a manager over the given store and registry.
    ///
    /// `default_data` seeds the records created by [`new_save`].
    ///
    /// [`new_save`]: DataManager::new_save
    pub fn new(
        store: SharedStore,
        registry: SharedRegistry,
        default_data: D,
        config: ManagerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                store,
                registry,
                default_data,
                config,
                cache: RecordCache::new(),
                save_locks: Mutex::new(HashMap::new()),
                pending: Mutex::new(HashSet::new()),
                loaded: Notify::new(),
                drained: Notify::new(),
            }),
        }
    }

    /// The manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Create a fresh record for a session, replacing any cached entry.
    ///
    /// The record starts from the default payload with `owner` stamped to
    /// `session`. No store I/O happens; the record reaches the store on
    /// the next save. Callers invoke this or [`load`] once per session
    /// start; the two are last-writer-wins against each other.
    ///
    /// [`load`]: DataManager::load
    pub async fn new_save(&self, session: SessionId, slot: SaveSlot) {
        let record = Record::new(session, self.inner.default_data.clone());
        self.inner
            .cache
            .insert(
                session,
                CacheEntry {
                    save_slot: slot,
                    record,
                },
            )
            .await;
        self.inner.loaded.notify_waiters();

        debug!(session_id = %session, slot = %slot, "New record created");
    }

    /// Fetch the raw stored payload for a session's slot, if any.
    ///
    /// Useful as a "does a save exist" probe before deciding between
    /// [`load`] and [`new_save`]. Never touches the cache.
    ///
    /// [`load`]: DataManager::load
    /// [`new_save`]: DataManager::new_save
    pub async fn fetch_raw(&self, session: SessionId, slot: SaveSlot) -> Result<Option<Vec<u8>>> {
        let key = store_key(session, slot);
        Ok(self.inner.store.get(&key).await?)
    }

    /// Load a session's record from the store into the cache.
    ///
    /// Absent and undecodable payloads leave the cache untouched and are
    /// reported in the [`LoadOutcome`] rather than as errors. A payload
    /// owned by a different session fails with [`Error::Integrity`] and is
    /// never cached. If the registry reports the session gone by the time
    /// the payload arrives (it disconnected while the read was in flight),
    /// the record is discarded and `Absent` is returned.
    pub async fn load(&self, session: SessionId, slot: SaveSlot) -> Result<LoadOutcome> {
        let Some(payload) = self.fetch_raw(session, slot).await? else {
            return Ok(LoadOutcome::Absent);
        };

        let record: Record<D> = match codec::decode(&payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    session_id = %session,
                    slot = %slot,
                    error = %e,
                    "Stored payload does not decode as a record"
                );
                return Ok(LoadOutcome::Malformed(e));
            }
        };

        if record.owner() != session {
            error!(
                session_id = %session,
                owner = %record.owner(),
                "Integrity check failed: record owned by another session"
            );
            return Err(Error::Integrity {
                session,
                owner: record.owner(),
            });
        }

        // Caching a record for a session that already left would strand an
        // entry no leave event will ever clear.
        if !self.inner.registry.is_active(session) {
            debug!(session_id = %session, "Session left during load, discarding record");
            return Ok(LoadOutcome::Absent);
        }

        self.inner
            .cache
            .insert(
                session,
                CacheEntry {
                    save_slot: slot,
                    record,
                },
            )
            .await;
        self.inner.loaded.notify_waiters();

        debug!(session_id = %session, slot = %slot, "Record loaded");
        Ok(LoadOutcome::Loaded)
    }

    /// Persist a session's cached record to the store.
    ///
    /// Fails with [`Error::NotLoaded`] if the session has no cached
    /// record. The entry is snapshotted under the cache lock, so the
    /// stored payload is always one consistent state. Writes for the same
    /// session are serialized against each other and against
    /// [`final_save`]; transient store failures are retried with backoff.
    ///
    /// [`final_save`]: DataManager::final_save
    pub async fn save(&self, session: SessionId) -> Result<()> {
        let lock = self.save_lock(session);
        let _guard = lock.lock().await;

        let entry = self
            .inner
            .cache
            .get(session)
            .await
            .ok_or(Error::NotLoaded(session))?;

        self.write_entry(session, &entry).await
    }

    /// Persist a session's record and evict it from the cache.
    ///
    /// The eviction holds whether or not the store write succeeds; a
    /// failed final save never resurrects the entry. The pending marker
    /// that gates [`drain`] is set before the eviction and cleared once
    /// the write finishes, on success and failure alike. Fails with
    /// [`Error::NotLoaded`] when nothing was cached.
    ///
    /// [`drain`]: DataManager::drain
    pub async fn final_save(&self, session: SessionId) -> Result<()> {
        self.inner.pending.lock().insert(session);

        let lock = self.save_lock(session);
        let guard = lock.lock().await;

        let Some(entry) = self.inner.cache.remove(session).await else {
            drop(guard);
            drop(lock);
            self.clear_pending(session);
            self.gc_save_lock(session);
            return Err(Error::NotLoaded(session));
        };

        let result = self.write_entry(session, &entry).await;

        drop(guard);
        drop(lock);
        self.clear_pending(session);
        self.gc_save_lock(session);

        if result.is_ok() {
            debug!(session_id = %session, "Final save complete, record evicted");
        }
        result
    }

    /// Save every active session's cached record.
    ///
    /// Sessions without a cached record are skipped. Failures are
    /// collected per session rather than aborting the sweep.
    pub async fn save_all(&self) -> Vec<(SessionId, Error)> {
        let mut failures = Vec::new();

        for session in self.inner.registry.active_sessions() {
            match self.save(session).await {
                Ok(()) => {}
                // nothing cached for this session, nothing to sweep
                Err(Error::NotLoaded(_)) => {}
                Err(e) => {
                    warn!(session_id = %session, error = %e, "Save failed during sweep");
                    failures.push((session, e));
                }
            }
        }

        failures
    }

    /// Wait until a session's record is cached, returning a snapshot.
    ///
    /// Returns `None` once the registry reports the session inactive,
    /// covering sessions that disconnect while their load is still in
    /// flight. Wakes as soon as a load or new-save lands; the registry is
    /// re-checked at `waiter_poll_interval` regardless, so a missed wakeup
    /// costs at most one interval.
    pub async fn wait_for_data(&self, session: SessionId) -> Option<CacheEntry<D>> {
        loop {
            let notified = self.inner.loaded.notified();

            if let Some(entry) = self.inner.cache.get(session).await {
                return Some(entry);
            }
            if !self.inner.registry.is_active(session) {
                return None;
            }

            let _ = timeout(self.inner.config.waiter_poll_interval, notified).await;
        }
    }

    /// Read access to a session's cached record.
    pub async fn with_record<F, R>(&self, session: SessionId, f: F) -> Result<R>
    where
        F: FnOnce(&Record<D>) -> R,
    {
        self.inner
            .cache
            .with_entry(session, |entry| f(&entry.record))
            .await
            .ok_or(Error::NotLoaded(session))
    }

    /// Mutate a session's domain payload in place.
    ///
    /// Hands out the payload only; the owner stamp cannot change. The
    /// mutation runs under the cache lock, so a concurrent save snapshots
    /// either all of it or none of it. The next save persists it.
    pub async fn with_record_mut<F, R>(&self, session: SessionId, f: F) -> Result<R>
    where
        F: FnOnce(&mut D) -> R,
    {
        self.inner
            .cache
            .with_entry_mut(session, |entry| f(entry.record.data_mut()))
            .await
            .ok_or(Error::NotLoaded(session))
    }

    /// Whether the session currently has a cached record.
    pub async fn contains(&self, session: SessionId) -> bool {
        self.inner.cache.contains(session).await
    }

    /// Observable lifecycle state for a session.
    pub async fn state(&self, session: SessionId) -> SessionState {
        if self.inner.cache.contains(session).await {
            SessionState::Loaded
        } else if self.inner.pending.lock().contains(&session) {
            SessionState::Saving
        } else {
            SessionState::Unloaded
        }
    }

    /// Current counters.
    pub async fn stats(&self) -> ManagerStats {
        ManagerStats {
            loaded: self.inner.cache.len().await,
            pending: self.inner.pending.lock().len(),
        }
    }

    /// Block until every in-flight final save has completed.
    ///
    /// This is the handler the host awaits before terminating. An initial
    /// grace period lets a final save triggered by the same shutdown event
    /// register as pending; after that the wait wakes as final saves
    /// finish, re-checking at `drain_poll_interval`. The total wait, grace
    /// included, is capped at `drain_max_wait` and fails with
    /// [`Error::DrainTimedOut`] instead of hanging the process.
    pub async fn drain(&self) -> Result<()> {
        let config = &self.inner.config;
        let deadline = tokio::time::Instant::now() + config.drain_max_wait;

        info!("Drain started, waiting for in-flight final saves");
        tokio::time::sleep(config.drain_grace).await;

        loop {
            let notified = self.inner.drained.notified();

            let outstanding = self.inner.pending.lock().len();
            if outstanding == 0 {
                info!("Drain complete");
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                error!(outstanding, "Drain timed out with final saves outstanding");
                return Err(Error::DrainTimedOut { outstanding });
            }

            let _ = timeout(config.drain_poll_interval, notified).await;
        }
    }

    /// Encode an entry and write it to the store, retrying transient
    /// failures with doubling backoff. Caller holds the session's write
    /// lock.
    async fn write_entry(&self, session: SessionId, entry: &CacheEntry<D>) -> Result<()> {
        let key = store_key(session, entry.save_slot);
        let payload = codec::encode(&entry.record)?;

        let max_attempts = self.inner.config.max_save_attempts.max(1);
        let mut backoff = self.inner.config.save_retry_backoff;
        let mut attempt = 1;

        loop {
            match self.inner.store.set(&key, payload.clone()).await {
                Ok(()) => {
                    debug!(session_id = %session, key = %key, "Record persisted");
                    return Ok(());
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        error!(
                            session_id = %session,
                            key = %key,
                            error = %e,
                            "Store write failed, giving up"
                        );
                        return Err(Error::Store(e));
                    }

                    warn!(
                        session_id = %session,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Store write failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
            }
        }
    }

    /// Per-session lock serializing the read-encode-write sequence of
    /// save and final save.
    fn save_lock(&self, session: SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.inner.save_locks.lock();
        Arc::clone(locks.entry(session).or_default())
    }

    /// Remove a session from the pending set and wake the drain.
    fn clear_pending(&self, session: SessionId) {
        self.inner.pending.lock().remove(&session);
        self.inner.drained.notify_waiters();
    }

    /// Drop a session's write lock entry once no holder remains.
    ///
    /// A queued saver keeps the Arc alive, so the entry stays and every
    /// writer for the session keeps converging on the same lock; only a
    /// lock nobody holds is removed.
    fn gc_save_lock(&self, session: SessionId) {
        let mut locks = self.inner.save_locks.lock();
        if let Some(lock) = locks.get(&session) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&session);
            }
        }
    }
}

impl<D> Clone for DataManager<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
