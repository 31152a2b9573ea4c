//! Periodic background refresh.
//!
//! Sleeps for `scan_interval_seconds`, runs a full refresh, repeats.
//! Cancellation is observed at the sleep boundary by aborting the task
//! and awaiting its join handle, with no error propagated on shutdown.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::indexer::Indexer;
use crate::store::Store;

/// Handle to a running periodic-scan task. Dropping this handle does not
/// stop the task; call `shutdown` to cancel it and await completion.
pub struct Scheduler {
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the periodic-scan task on the current `tokio` runtime.
    pub fn start(indexer: Arc<Indexer>, store: Arc<Mutex<Store>>, interval_seconds: u64) -> Self {
        let interval = std::time::Duration::from_secs(interval_seconds);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut guard = store.lock().await;
                match indexer.refresh(&mut guard, None, false) {
                    Ok(result) if !result.success => {
                        tracing::warn!(errors = ?result.errors, "scheduler: periodic refresh had errors");
                    }
                    Ok(result) => {
                        tracing::debug!(
                            processed = result.files_processed,
                            removed = result.files_removed,
                            "scheduler: periodic refresh complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "scheduler: periodic refresh failed");
                    }
                }
            }
        });
        Self { handle }
    }

    /// Cancel the periodic-scan task and wait for it to stop.
    ///
    /// The task is aborted rather than asked to exit cooperatively since its
    /// only suspension point is the sleep itself; awaiting the aborted
    /// handle's `JoinError` (always `is_cancelled()` here) is treated as a
    /// clean shutdown rather than an error.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}
