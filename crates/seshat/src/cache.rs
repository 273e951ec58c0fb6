//! In-memory record cache.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::trace;

use crate::record::{SaveSlot, SessionId};

/// Entry held in the cache: a loaded record and the slot it belongs to.
#[derive(Debug, Clone)]
pub struct CacheEntry<D> {
    /// Save slot the record was loaded from and will be saved to.
    pub save_slot: SaveSlot,

    /// The session's record.
    pub record: crate::record::Record<D>,
}

/// Inner state protected by RwLock.
struct CacheInner<D> {
    entries: HashMap<SessionId, CacheEntry<D>>,
}

/// Map from session to its loaded record.
///
/// Single source of truth while a session is active: at most one entry per
/// session, created by load or new-save, destroyed by final save. Reads
/// hand out clones; in-place mutation goes through the closure accessors.
/// No I/O happens here, and the lock is never held across any.
pub(crate) struct RecordCache<D> {
    inner: Arc<RwLock<CacheInner<D>>>,
}

impl<D: Clone> RecordCache<D> {
    /// Create an empty cache.
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                entries: HashMap::new(),
            })),
        }
    }

    /// Number of cached sessions.
    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Clone out a session's entry.
    pub(crate) async fn get(&self, session: SessionId) -> Option<CacheEntry<D>> {
        self.inner.read().await.entries.get(&session).cloned()
    }

    /// Insert an entry, replacing any existing one for the session.
    pub(crate) async fn insert(&self, session: SessionId, entry: CacheEntry<D>) {
        let mut inner = self.inner.write().await;
        inner.entries.insert(session, entry);

        trace!(
            session_id = %session,
            cache_size = inner.entries.len(),
            "Record inserted into cache"
        );
    }

    /// Remove and return a session's entry.
    pub(crate) async fn remove(&self, session: SessionId) -> Option<CacheEntry<D>> {
        let mut inner = self.inner.write().await;
        let entry = inner.entries.remove(&session);

        if entry.is_some() {
            trace!(session_id = %session, "Record removed from cache");
        }

        entry
    }

    /// Check whether a session has a cached record.
    pub(crate) async fn contains(&self, session: SessionId) -> bool {
        self.inner.read().await.entries.contains_key(&session)
    }

    /// Read-only access to a cached entry.
    pub(crate) async fn with_entry<F, R>(&self, session: SessionId, f: F) -> Option<R>
    where
        F: FnOnce(&CacheEntry<D>) -> R,
    {
        let inner = self.inner.read().await;
        inner.entries.get(&session).map(f)
    }

    /// Mutable access to a cached entry.
    pub(crate) async fn with_entry_mut<F, R>(&self, session: SessionId, f: F) -> Option<R>
    where
        F: FnOnce(&mut CacheEntry<D>) -> R,
    {
        let mut inner = self.inner.write().await;
        inner.entries.get_mut(&session).map(f)
    }
}

impl<D> Clone for RecordCache<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
