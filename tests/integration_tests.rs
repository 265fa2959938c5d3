// End-to-end: sampler worker feeding the push channel, a sync session
// attached with the collector as its bootstrap pull source.

use dashcore::collector::Collector;
use dashcore::sync::SnapshotSync;
use dashcore::worker::{WorkerConfig, WorkerDeps, spawn};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, timeout};

#[tokio::test]
async fn attached_session_receives_live_snapshots() {
    let collector = Arc::new(Collector::new());
    let (tx, _) = broadcast::channel(8);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let worker_handle = spawn(
        WorkerDeps {
            collector: collector.clone(),
            tx: tx.clone(),
            shutdown_rx,
        },
        WorkerConfig {
            sample_interval_ms: 20,
            emit_interval_ms: 80,
            top_processes: 5,
            stats_log_interval_secs: 3600,
        },
    );

    let sync = SnapshotSync::new(tx, collector);
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let mut session = sync.attach(move |snap| {
        let _ = seen_tx.send(snap);
    });

    // Either the bootstrap pull or the first emit lands here; both carry
    // real system data.
    let snap = timeout(Duration::from_secs(10), seen_rx.recv())
        .await
        .expect("session should receive a snapshot")
        .expect("callback channel open");
    assert!(snap.cpu.cores > 0);
    assert!(snap.mem.total > 0);

    session.detach();
    let _ = shutdown_tx.send(());
    worker_handle.await.unwrap();
}
