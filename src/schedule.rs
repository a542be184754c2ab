//! Cancellable delayed tasks.
//!
//! [`schedule_cleanup`] spawns a tokio task that sleeps, then runs a
//! closure exactly once unless the returned [`CleanupHandle`] is cancelled
//! first. Firing and cancelling race on one atomic flag, so whichever
//! settles the handle first wins and the other becomes a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Handle to a pending cleanup. Cloning shares the same task.
#[derive(Debug, Clone)]
pub struct CleanupHandle {
    settled: Arc<AtomicBool>,
    abort: AbortHandle,
}

impl CleanupHandle {
    /// Prevent the cleanup from running.
    ///
    /// Returns `true` if this call stopped it, `false` if it had already
    /// fired or been cancelled. Safe to call any number of times.
    pub fn cancel(&self) -> bool {
        if self.settled.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.abort.abort();
        true
    }

    /// True until the cleanup fires or is cancelled.
    pub fn is_pending(&self) -> bool {
        !self.settled.load(Ordering::SeqCst)
    }
}

/// Run `cleanup` after `delay` on the current tokio runtime.
///
/// Must be called from within a runtime.
pub fn schedule_cleanup<F>(delay: Duration, cleanup: F) -> CleanupHandle
where
    F: FnOnce() + Send + 'static,
{
    let settled = Arc::new(AtomicBool::new(false));
    let flag = settled.clone();
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if flag.swap(true, Ordering::SeqCst) {
            return;
        }
        cleanup();
    });
    CleanupHandle {
        settled,
        abort: task.abort_handle(),
    }
}
