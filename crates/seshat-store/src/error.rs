//! Error types for store adapters.

use thiserror::Error;

/// Errors that can occur talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store is unreachable or refused the operation.
    /// Transient: callers on save paths may retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database connection or operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
