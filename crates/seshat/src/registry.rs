//! Session registry seam.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::record::SessionId;

/// Source of truth for which sessions are currently connected.
///
/// Implemented by the embedding host. Methods are synchronous and must not
/// block: the engine calls them from async context, expecting snapshots of
/// local state.
pub trait SessionRegistry: Send + Sync {
    /// Snapshot of all currently active sessions.
    fn active_sessions(&self) -> Vec<SessionId>;

    /// Whether one session is still active.
    fn is_active(&self, session: SessionId) -> bool;
}

/// A registry that can be shared across tasks.
pub type SharedRegistry = Arc<dyn SessionRegistry>;

/// Registry tracking sessions in a local set.
///
/// Suitable for tests and single-process hosts: call [`join`] and
/// [`leave`] from the host's connect and disconnect events.
///
/// [`join`]: InMemoryRegistry::join
/// [`leave`]: InMemoryRegistry::leave
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    active: RwLock<HashSet<SessionId>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a session active.
    pub fn join(&self, session: SessionId) {
        self.active.write().insert(session);
    }

    /// Mark a session inactive.
    pub fn leave(&self, session: SessionId) {
        self.active.write().remove(&session);
    }
}

impl SessionRegistry for InMemoryRegistry {
    fn active_sessions(&self) -> Vec<SessionId> {
        self.active.read().iter().copied().collect()
    }

    fn is_active(&self, session: SessionId) -> bool {
        self.active.read().contains(&session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_leave() {
        let registry = InMemoryRegistry::new();
        assert!(!registry.is_active(SessionId(1)));

        registry.join(SessionId(1));
        registry.join(SessionId(2));
        assert!(registry.is_active(SessionId(1)));
        assert_eq!(registry.active_sessions().len(), 2);

        registry.leave(SessionId(1));
        assert!(!registry.is_active(SessionId(1)));
        assert_eq!(registry.active_sessions(), vec![SessionId(2)]);
    }
}
