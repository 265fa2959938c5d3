// Store propagation: keeps a session's copy of a persisted collection in
// step with both external writers and this process's own saves.

use super::ShortcutStore;
use crate::models::Shortcut;
use crate::session::SessionHandle;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, oneshot};

pub struct StorePropagator {
    store: Arc<ShortcutStore>,
}

impl StorePropagator {
    pub fn new(store: Arc<ShortcutStore>) -> Self {
        Self { store }
    }

    /// Registers both change listeners, delivers the current value once
    /// (synchronous bootstrap - the store is a direct durable read, so no
    /// race window exists here), then redelivers on every external or
    /// in-process change for `key` until the returned handle detaches.
    ///
    /// The two listeners stay separate because they cover distinct origins:
    /// the filesystem watcher only fires for other writers, and the
    /// in-process signal only fires for this store's own saves.
    pub fn attach(
        &self,
        key: &str,
        mut on_change: impl FnMut(Vec<Shortcut>) + Send + 'static,
    ) -> SessionHandle {
        let mut external_rx = self.store.subscribe_external();
        let mut in_process_rx = self.store.subscribe_in_process();

        match self.store.load(key) {
            Ok(items) => on_change(items),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, operation = "load", "bootstrap load failed");
            }
        }

        let store = self.store.clone();
        let key = key.to_string();
        let alive = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task_alive = alive.clone();

        tokio::spawn(async move {
            loop {
                let changed = tokio::select! {
                    result = external_rx.recv() => result,
                    result = in_process_rx.recv() => result,
                    _ = &mut shutdown_rx => break,
                };
                let changed_key = match changed {
                    Ok(k) => k,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Missed signals collapse into one reload.
                        tracing::debug!(skipped = n, key = %key, "change listener lagged");
                        key.clone()
                    }
                    // Both senders live in the store; if it is gone there is
                    // nothing left to propagate.
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if changed_key != key {
                    continue;
                }
                if !task_alive.load(Ordering::Acquire) {
                    break;
                }
                match store.load(&key) {
                    Ok(items) => on_change(items),
                    Err(e) => {
                        tracing::warn!(error = %e, key = %key, operation = "load", "reload after change failed");
                    }
                }
            }
        });

        SessionHandle::new(alive, shutdown_tx)
    }
}
