// Snapshot sync: push-channel subscription with a pull-based bootstrap.

use crate::models::Snapshot;
use crate::session::SessionHandle;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, oneshot};

/// One-shot snapshot fetch, used only to avoid an empty initial view before
/// the first push arrives.
pub trait SnapshotSource: Send + Sync + 'static {
    fn pull_once(&self) -> impl Future<Output = anyhow::Result<Snapshot>> + Send;
}

/// Attach point for consuming views. The push channel and the source are
/// process-wide; each attached session owns only its own subscription.
pub struct SnapshotSync<S> {
    tx: broadcast::Sender<Snapshot>,
    source: Arc<S>,
}

impl<S: SnapshotSource> SnapshotSync<S> {
    pub fn new(tx: broadcast::Sender<Snapshot>, source: Arc<S>) -> Self {
        Self { tx, source }
    }

    /// Subscribes to the push channel, issues the bootstrap pull, and
    /// forwards every snapshot to `on_update` until the returned handle
    /// detaches.
    ///
    /// The subscription is taken strictly before the pull is issued: a push
    /// emitted during the pull round trip would otherwise be lost. The pull
    /// result is applied only while no push has arrived; once real data
    /// exists the pull is stale by definition and is discarded. A failed
    /// pull is logged and swallowed - the session stays live and waits for
    /// the first push.
    pub fn attach(&self, mut on_update: impl FnMut(Snapshot) + Send + 'static) -> SessionHandle {
        let mut rx = self.tx.subscribe();
        let source = self.source.clone();
        let alive = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task_alive = alive.clone();

        tokio::spawn(async move {
            let pull = source.pull_once();
            tokio::pin!(pull);
            let mut pull_pending = true;
            // Latest value owned by this session alone, replaced wholesale.
            let mut latest: Option<Snapshot> = None;

            loop {
                tokio::select! {
                    result = rx.recv() => match result {
                        Ok(snapshot) => {
                            if !task_alive.load(Ordering::Acquire) {
                                break;
                            }
                            latest = Some(snapshot.clone());
                            on_update(snapshot);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "snapshot subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    result = &mut pull, if pull_pending => {
                        pull_pending = false;
                        match result {
                            Ok(snapshot) if latest.is_none() => {
                                if !task_alive.load(Ordering::Acquire) {
                                    break;
                                }
                                latest = Some(snapshot.clone());
                                on_update(snapshot);
                            }
                            // A push already won the race; the pull value is
                            // older or equal and must not overwrite it.
                            Ok(_) => {}
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    operation = "pull_once",
                                    "bootstrap pull failed; waiting for push"
                                );
                            }
                        }
                    },
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        SessionHandle::new(alive, shutdown_tx)
    }
}
