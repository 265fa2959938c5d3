// Worker integration test: spawn the sampler, receive an emitted snapshot,
// shut down cleanly.

use dashcore::collector::Collector;
use dashcore::worker::{WorkerConfig, WorkerDeps, spawn};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

#[tokio::test]
async fn worker_emits_snapshots_and_shuts_down() {
    let collector = Arc::new(Collector::new());
    let (tx, mut rx) = broadcast::channel(8);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn(
        WorkerDeps {
            collector,
            tx,
            shutdown_rx,
        },
        WorkerConfig {
            sample_interval_ms: 20,
            emit_interval_ms: 80,
            top_processes: 5,
            stats_log_interval_secs: 3600,
        },
    );

    let snap = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("worker should emit within the window")
        .expect("broadcast recv");
    assert!(snap.cpu.cores > 0);
    assert!(snap.cpu.top_processes.len() <= 5);

    let _ = shutdown_tx.send(());
    handle.await.unwrap();
}

#[tokio::test]
async fn worker_stops_on_shutdown_before_first_emit() {
    let collector = Arc::new(Collector::new());
    let (tx, _rx) = broadcast::channel(8);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn(
        WorkerDeps {
            collector,
            tx,
            shutdown_rx,
        },
        WorkerConfig {
            sample_interval_ms: 1000,
            emit_interval_ms: 60_000,
            top_processes: 5,
            stats_log_interval_secs: 3600,
        },
    );

    let _ = shutdown_tx.send(());
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop promptly")
        .unwrap();
}
