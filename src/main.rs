use anyhow::Result;
use dashcore::*;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

/// Default store key for the launcher shortcut collection.
const SHORTCUTS_KEY: &str = "caw-shortcuts";

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let (tx, _) = broadcast::channel::<models::Snapshot>(app_config.publishing.broadcast_capacity);

    let collector = Arc::new(collector::Collector::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            collector: collector.clone(),
            tx: tx.clone(),
            shutdown_rx,
        },
        worker::WorkerConfig {
            sample_interval_ms: app_config.monitoring.sample_interval_ms,
            emit_interval_ms: app_config.publishing.emit_interval_ms,
            top_processes: app_config.monitoring.top_processes,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
        },
    );

    let shortcut_store = Arc::new(store::ShortcutStore::open(&app_config.store.path)?);
    let propagator = store::StorePropagator::new(shortcut_store);
    let mut shortcut_session = propagator.attach(SHORTCUTS_KEY, |items| {
        tracing::info!(shortcuts = items.len(), "shortcut collection changed");
    });

    let snapshot_sync = sync::SnapshotSync::new(tx, collector);
    let mut snapshot_session = snapshot_sync.attach(|snap| {
        tracing::info!(
            cpu_percent = snap.cpu.global_percent as f64,
            mem_used = snap.mem.used,
            partitions = snap.disk.partitions.len(),
            interfaces = snap.net.len(),
            "snapshot"
        );
    });

    tracing::info!(version = version::VERSION, "{} running", version::NAME);

    wait_for_shutdown().await;
    tracing::info!("Received shutdown signal");
    snapshot_session.detach();
    shortcut_session.detach();
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;

    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
