//! Keyed blob storage for seshat.
//!
//! Defines the [`DataStore`] trait the coordination engine persists through,
//! plus two adapters: [`MemoryStore`] for tests and local harnesses, and
//! [`SqliteStore`] for durable single-node deployments.

mod error;
mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A durable key-value store for serialized records.
///
/// Keys are flat strings, values opaque byte payloads. `get` distinguishes
/// "no value stored" from transport failure; `set` overwrites
/// unconditionally. Implementations must be shareable across tasks.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch the payload stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any existing payload.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// A store that can be shared across tasks.
pub type SharedStore = Arc<dyn DataStore>;
