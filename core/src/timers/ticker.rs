//! Per-timer tick scheduling
//!
//! Each running timer owns one 1 Hz interval task. Cancellation aborts the
//! tokio task itself rather than flipping a checked flag, so a cancelled
//! loop can never fire again; a tick already in flight re-checks record
//! status against the store and backs off.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Cadence of the per-timer recompute loop.
pub(super) const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Outcome of a single tick recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Tick {
    /// Timer is still counting down
    Continue,
    /// Timer reached zero and was finished; the loop must exit
    Finished,
    /// Record is gone or no longer running; the loop must exit
    Stopped,
}

/// Registry of per-timer tick task handles.
#[derive(Debug, Default)]
pub(super) struct TickTasks {
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TickTasks {
    /// Register the tick task for a timer, aborting any previous loop still
    /// registered under the same id.
    pub(super) fn insert(&self, id: &str, handle: JoinHandle<()>) {
        if let Some(old) = self.handles.lock().unwrap().insert(id.to_string(), handle) {
            old.abort();
        }
    }

    /// Abort and deregister a timer's tick task. Returns whether one existed.
    pub(super) fn cancel(&self, id: &str) -> bool {
        match self.handles.lock().unwrap().remove(id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Deregister without aborting, for loops that exit on their own.
    pub(super) fn forget(&self, id: &str) {
        self.handles.lock().unwrap().remove(id);
    }

    /// Abort every registered tick task.
    pub(super) fn cancel_all(&self) {
        for (_, handle) in self.handles.lock().unwrap().drain() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.handles.lock().unwrap().len()
    }
}
