// Session lifecycle shared by snapshot sync and store propagation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;

/// Handle for one live subscription, returned by `attach`. Detaching (or
/// dropping the handle) stops the paired callback for good: the delivery
/// task checks the liveness flag before every invocation, so events already
/// in flight at detach time are discarded rather than delivered.
#[derive(Debug)]
pub struct SessionHandle {
    alive: Arc<AtomicBool>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl SessionHandle {
    pub(crate) fn new(alive: Arc<AtomicBool>, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            alive,
            shutdown: Some(shutdown),
        }
    }

    /// True until the first `detach` call (or drop).
    pub fn is_attached(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Stops delivery and releases the subscription. Calling it again is a
    /// no-op.
    pub fn detach(&mut self) {
        if self.alive.swap(false, Ordering::AcqRel)
            && let Some(tx) = self.shutdown.take()
        {
            let _ = tx.send(());
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.detach();
    }
}
