//! Error types for cache and persistence operations.

use seshat_store::StoreError;

use crate::record::SessionId;

/// Error type for cache and persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Save requested for a session with no cached record.
    #[error("No record loaded for session {0}")]
    NotLoaded(SessionId),

    /// Loaded payload belongs to a different session. Fatal; never retried.
    #[error("Integrity check failed for session {session}: record owned by {owner}")]
    Integrity {
        /// Session the payload was loaded for.
        session: SessionId,
        /// Owner stamped inside the payload.
        owner: SessionId,
    },

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Record could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Shutdown drain hit its cap with final saves still outstanding.
    #[error("Drain timed out with {outstanding} final save(s) outstanding")]
    DrainTimedOut {
        /// Sessions still pending when the cap was reached.
        outstanding: usize,
    },
}

/// Result type for cache and persistence operations.
pub type Result<T> = std::result::Result<T, Error>;
