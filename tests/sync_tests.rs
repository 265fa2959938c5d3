// Snapshot sync race and lifecycle tests: bootstrap ordering, late-pull
// discard, post-detach silence, idempotent detach.

mod common;

use dashcore::models::Snapshot;
use dashcore::sync::{SnapshotSource, SnapshotSync};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Duration, timeout};

/// Pull source whose resolution is driven by the test through a oneshot.
struct GatedSource {
    gate: Mutex<Option<oneshot::Receiver<anyhow::Result<Snapshot>>>>,
}

impl SnapshotSource for GatedSource {
    fn pull_once(&self) -> impl Future<Output = anyhow::Result<Snapshot>> + Send {
        let rx = self
            .gate
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        async move {
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("pull abandoned"))),
                None => Err(anyhow::anyhow!("pull already taken")),
            }
        }
    }
}

type PullTrigger = oneshot::Sender<anyhow::Result<Snapshot>>;

fn make_sync() -> (
    broadcast::Sender<Snapshot>,
    SnapshotSync<GatedSource>,
    PullTrigger,
) {
    let (tx, _) = broadcast::channel(16);
    let (pull_tx, pull_rx) = oneshot::channel();
    let source = Arc::new(GatedSource {
        gate: Mutex::new(Some(pull_rx)),
    });
    (tx.clone(), SnapshotSync::new(tx, source), pull_tx)
}

async fn recv_within(rx: &mut mpsc::UnboundedReceiver<u64>, secs: u64) -> Option<u64> {
    timeout(Duration::from_secs(secs), rx.recv())
        .await
        .ok()
        .flatten()
}

async fn assert_silent(rx: &mut mpsc::UnboundedReceiver<u64>) {
    let extra = timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(extra.is_err(), "callback fired when it should be silent");
}

#[tokio::test]
async fn pull_bootstraps_when_no_push_has_arrived() {
    let (tx, sync, pull_tx) = make_sync();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let mut session = sync.attach(move |s| {
        let _ = seen_tx.send(s.timestamp);
    });

    pull_tx.send(Ok(common::snapshot(1))).unwrap();
    assert_eq!(recv_within(&mut seen_rx, 2).await, Some(1));

    // Live pushes keep flowing after the bootstrap.
    tx.send(common::snapshot(2)).unwrap();
    assert_eq!(recv_within(&mut seen_rx, 2).await, Some(2));
    session.detach();
}

#[tokio::test]
async fn push_wins_race_against_late_pull() {
    let (tx, sync, pull_tx) = make_sync();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let mut session = sync.attach(move |s| {
        let _ = seen_tx.send(s.timestamp);
    });

    // Push S1 arrives first, then the pull resolves with the older S0.
    tx.send(common::snapshot(2)).unwrap();
    assert_eq!(recv_within(&mut seen_rx, 2).await, Some(2));
    pull_tx.send(Ok(common::snapshot(1))).unwrap();

    // The next delivery must be the next push, never the stale pull value.
    tx.send(common::snapshot(3)).unwrap();
    assert_eq!(recv_within(&mut seen_rx, 2).await, Some(3));
    session.detach();
}

#[tokio::test]
async fn pull_failure_is_non_fatal() {
    let (tx, sync, pull_tx) = make_sync();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let mut session = sync.attach(move |s| {
        let _ = seen_tx.send(s.timestamp);
    });

    pull_tx
        .send(Err(anyhow::anyhow!("collector unreachable")))
        .unwrap();

    // The subscription survives; the first push is delivered normally.
    tx.send(common::snapshot(5)).unwrap();
    assert_eq!(recv_within(&mut seen_rx, 2).await, Some(5));
    session.detach();
}

#[tokio::test]
async fn no_callback_after_detach() {
    let (tx, sync, _pull_tx) = make_sync();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let mut session = sync.attach(move |s| {
        let _ = seen_tx.send(s.timestamp);
    });

    tx.send(common::snapshot(1)).unwrap();
    assert_eq!(recv_within(&mut seen_rx, 2).await, Some(1));

    session.detach();
    let _ = tx.send(common::snapshot(2));
    let _ = tx.send(common::snapshot(3));
    assert_silent(&mut seen_rx).await;
}

#[tokio::test]
async fn pull_resolving_after_detach_delivers_nothing() {
    let (_tx, sync, pull_tx) = make_sync();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let mut session = sync.attach(move |s| {
        let _ = seen_tx.send(s.timestamp);
    });

    session.detach();
    // The pull is already in flight; its resolution must be discarded.
    let _ = pull_tx.send(Ok(common::snapshot(1)));
    assert_silent(&mut seen_rx).await;
}

#[tokio::test]
async fn detach_is_idempotent() {
    let (_tx, sync, _pull_tx) = make_sync();
    let mut session = sync.attach(|_| {});
    assert!(session.is_attached());
    session.detach();
    session.detach();
    assert!(!session.is_attached());
}

#[tokio::test]
async fn dropping_the_handle_detaches() {
    let (tx, sync, _pull_tx) = make_sync();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let session = sync.attach(move |s| {
        let _ = seen_tx.send(s.timestamp);
    });
    drop(session);

    let _ = tx.send(common::snapshot(1));
    assert_silent(&mut seen_rx).await;
}
