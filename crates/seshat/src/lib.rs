//! Per-session record cache with scheduled durable persistence.
//!
//! Each active session owns one mutable in-memory record, mirrored to a
//! durable key-value store by a periodic autosave loop and by a final save
//! when the session ends. The engine serializes overlapping saves per
//! session, rejects records whose ownership stamp does not match the
//! session they were loaded for, and drains in-flight final saves before
//! the process shuts down.
//!
//! # Example
//!
//! ```rust,ignore
//! use seshat::{DataManager, ManagerConfig, SaveSlot, SessionId};
//!
//! let manager = DataManager::new(store, registry, PlayerData::default(), ManagerConfig::default());
//!
//! // session start
//! manager.new_save(SessionId(1), SaveSlot(0)).await;
//!
//! // background mirroring
//! let autosave = seshat::spawn_autosave(manager.clone());
//!
//! // shutdown
//! manager.drain().await?;
//! ```

mod cache;
mod codec;
mod config;
mod error;
mod manager;
mod record;
mod registry;
mod scheduler;

pub use cache::CacheEntry;
pub use codec::{decode, encode};
pub use config::ManagerConfig;
pub use error::{Error, Result};
pub use manager::{DataManager, LoadOutcome, ManagerStats, SessionState};
pub use record::{Record, SaveSlot, SessionId, store_key};
pub use registry::{InMemoryRegistry, SessionRegistry, SharedRegistry};
pub use scheduler::{
    AutosaveTask, LeaveListenerTask, PreleaveHook, spawn_autosave, spawn_leave_listener,
};
