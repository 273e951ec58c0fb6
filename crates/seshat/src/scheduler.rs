//! Background lifecycle tasks: the autosave loop and the leave listener.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::manager::DataManager;
use crate::record::{Record, SessionId};

/// Callback invoked with a session's record just before its final save.
pub type PreleaveHook<D> = Arc<dyn Fn(&Record<D>) + Send + Sync>;

/// Handle for the background autosave task.
pub struct AutosaveTask {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl AutosaveTask {
    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

/// Spawn the periodic autosave loop.
///
/// Every `autosave_interval` the loop sweeps all active sessions and
/// persists each cached record. Per-session failures are logged and never
/// stop the sweep or the loop. The first sweep runs one full interval
/// after spawn.
pub fn spawn_autosave<D>(manager: DataManager<D>) -> AutosaveTask
where
    D: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let period = manager.config().autosave_interval;
        let mut interval = tokio::time::interval(period);
        // a tokio interval fires immediately; swallow that tick so the
        // first sweep happens one period after startup
        interval.tick().await;

        info!(interval_secs = period.as_secs(), "Autosave loop started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let failures = manager.save_all().await;
                    if failures.is_empty() {
                        debug!("Autosave sweep complete");
                    } else {
                        warn!(failed = failures.len(), "Autosave sweep finished with failures");
                    }
                }
                _ = shutdown_rx.changed() => {
                    info!("Autosave loop shutting down");
                    break;
                }
            }
        }
    });

    AutosaveTask {
        shutdown_tx,
        handle,
    }
}

/// Handle for the background leave listener task.
pub struct LeaveListenerTask {
    handle: JoinHandle<()>,
}

impl LeaveListenerTask {
    /// Wait for the listener to exit.
    ///
    /// The task exits once every sender for its channel is dropped; drop
    /// the sender side before awaiting this.
    pub async fn shutdown(self) {
        let _ = self.handle.await;
    }
}

/// Spawn the listener consuming session-end notifications.
///
/// For each departing session: nothing happens if no record is cached
/// (the session never loaded, or was already saved and evicted).
/// Otherwise the optional `preleave` hook observes the record, then a
/// final save persists and evicts it. Failures are logged per session and
/// never crash the listener.
pub fn spawn_leave_listener<D>(
    manager: DataManager<D>,
    mut receiver: mpsc::Receiver<SessionId>,
    preleave: Option<PreleaveHook<D>>,
) -> LeaveListenerTask
where
    D: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let handle = tokio::spawn(async move {
        while let Some(session) = receiver.recv().await {
            if !manager.contains(session).await {
                debug!(session_id = %session, "Leave for session with nothing cached");
                continue;
            }

            if let Some(hook) = &preleave {
                // the record can disappear between the check above and
                // here; a missing record just skips the hook
                let _ = manager.with_record(session, |record| hook(record)).await;
            }

            match manager.final_save(session).await {
                Ok(()) => debug!(session_id = %session, "Session record saved on leave"),
                Err(Error::NotLoaded(_)) => {
                    debug!(session_id = %session, "Record already evicted on leave")
                }
                Err(e) => {
                    warn!(session_id = %session, error = %e, "Final save failed on leave")
                }
            }
        }

        debug!("Leave listener exiting, all senders dropped");
    });

    LeaveListenerTask { handle }
}
