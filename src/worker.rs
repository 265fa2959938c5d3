// Background telemetry worker: fast sampling, averaged emission.
// Samples accumulate between emits; the emitted snapshot carries the window
// average for gauges and an EMA for top-process CPU.

use crate::collector::Collector;
use crate::models::{CpuProcess, Snapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};

/// Rate limit for the "no receivers" log (avoid logging on every emit while
/// no session is attached).
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// EMA smoothing for top-process CPU; lower is smoother.
const PROCESS_EMA_ALPHA: f32 = 0.3;

/// Collector, channel, and shutdown for the worker.
pub struct WorkerDeps {
    pub collector: Arc<Collector>,
    pub tx: broadcast::Sender<Snapshot>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing config. Stats logging uses real-time intervals,
/// independent of sample_interval_ms.
pub struct WorkerConfig {
    pub sample_interval_ms: u64,
    pub emit_interval_ms: u64,
    /// Top-process list length in emitted snapshots.
    pub top_processes: usize,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Per-window sums for the averaged emit.
#[derive(Default)]
struct Accumulator {
    count: u64,
    cpu_global_sum: f64,
    cpu_per_core_sum: Vec<f64>,
    mem_used_sum: u128,
    mem_available_sum: u128,
    disk_read_sum: u128,
    disk_write_sum: u128,
    have_disk_io: bool,
    /// Interface name -> (rx B/s sum, tx B/s sum).
    nic_rate_sum: HashMap<String, (u128, u128)>,
}

impl Accumulator {
    fn add(&mut self, snap: &Snapshot) {
        self.count += 1;
        self.cpu_global_sum += snap.cpu.global_percent as f64;
        // Core count can change (hotplug); restart the per-core sums.
        if self.cpu_per_core_sum.len() != snap.cpu.per_core_percent.len() {
            self.cpu_per_core_sum = vec![0.0; snap.cpu.per_core_percent.len()];
        }
        for (i, v) in snap.cpu.per_core_percent.iter().enumerate() {
            self.cpu_per_core_sum[i] += *v as f64;
        }
        self.mem_used_sum += snap.mem.used as u128;
        self.mem_available_sum += snap.mem.available as u128;
        if let (Some(r), Some(w)) = (snap.disk.read_bytes_per_sec, snap.disk.write_bytes_per_sec) {
            self.disk_read_sum += r as u128;
            self.disk_write_sum += w as u128;
            self.have_disk_io = true;
        }
        for nic in &snap.net {
            let e = self.nic_rate_sum.entry(nic.name.clone()).or_insert((0, 0));
            e.0 += nic.rx_bytes_per_sec as u128;
            e.1 += nic.tx_bytes_per_sec as u128;
        }
    }

    /// Overwrites the gauges in `base` with the window averages.
    fn apply_to(&self, base: &mut Snapshot) {
        if self.count == 0 {
            return;
        }
        let count = self.count;
        base.cpu.global_percent = (self.cpu_global_sum / count as f64) as f32;
        for (i, sum) in self.cpu_per_core_sum.iter().enumerate() {
            if let Some(core) = base.cpu.per_core_percent.get_mut(i) {
                *core = (sum / count as f64) as f32;
            }
        }
        base.mem.used = (self.mem_used_sum / count as u128) as u64;
        base.mem.available = (self.mem_available_sum / count as u128) as u64;
        if self.have_disk_io {
            base.disk.read_bytes_per_sec = Some((self.disk_read_sum / count as u128) as u64);
            base.disk.write_bytes_per_sec = Some((self.disk_write_sum / count as u128) as u64);
        }
        for nic in base.net.iter_mut() {
            if let Some((rx_sum, tx_sum)) = self.nic_rate_sum.get(&nic.name) {
                nic.rx_bytes_per_sec = (rx_sum / count as u128) as u64;
                nic.tx_bytes_per_sec = (tx_sum / count as u128) as u64;
            }
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.cpu_global_sum = 0.0;
        self.cpu_per_core_sum.fill(0.0);
        self.mem_used_sum = 0;
        self.mem_available_sum = 0;
        self.disk_read_sum = 0;
        self.disk_write_sum = 0;
        self.have_disk_io = false;
        self.nic_rate_sum.clear();
    }
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        collector,
        tx,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        sample_interval_ms,
        emit_interval_ms,
        top_processes,
        stats_log_interval_secs,
    } = config;

    tokio::spawn(async move {
        let mut sample_tick = interval(Duration::from_millis(sample_interval_ms));
        sample_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut emit_tick = interval(Duration::from_millis(emit_interval_ms));
        emit_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut acc = Accumulator::default();
        // Process name -> smoothed CPU. Survives emit windows.
        let mut process_ema: HashMap<String, f32> = HashMap::new();
        // Latest raw sample; carries the structure (partitions, NIC list)
        // that averaging leaves untouched.
        let mut last_sample: Option<Snapshot> = None;
        let mut snapshots_emitted_total: u64 = 0;
        let mut last_no_receivers_log: Option<Instant> = None;

        let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", sample_interval_ms);
        let _guard = worker_span.enter();

        loop {
            tokio::select! {
                _ = sample_tick.tick() => {
                    let snap = match collector.read_once().await {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "read_once", "sample failed");
                            continue;
                        }
                    };
                    acc.add(&snap);
                    for p in &snap.cpu.top_processes {
                        let e = process_ema.entry(p.name.clone()).or_insert(p.cpu_percent);
                        *e = PROCESS_EMA_ALPHA * p.cpu_percent + (1.0 - PROCESS_EMA_ALPHA) * *e;
                    }
                    last_sample = Some(snap);
                }
                _ = emit_tick.tick() => {
                    let Some(mut base) = last_sample.clone() else {
                        continue;
                    };
                    acc.apply_to(&mut base);
                    let mut top: Vec<CpuProcess> = base
                        .cpu
                        .top_processes
                        .iter()
                        .map(|p| CpuProcess {
                            name: p.name.clone(),
                            cpu_percent: *process_ema.get(&p.name).unwrap_or(&p.cpu_percent),
                            memory: p.memory,
                        })
                        .collect();
                    top.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
                    top.truncate(top_processes);
                    base.cpu.top_processes = top;
                    base.timestamp = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or(base.timestamp);

                    if tx.send(base).is_err() {
                        let should_log = last_no_receivers_log
                            .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL);
                        if should_log {
                            tracing::debug!(
                                operation = "broadcast_snapshot",
                                "no attached sessions; broadcast channel has no receivers"
                            );
                            last_no_receivers_log = Some(Instant::now());
                        }
                    } else {
                        snapshots_emitted_total += 1;
                    }
                    acc.reset();
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        attached_sessions = tx.receiver_count(),
                        snapshots_emitted_total,
                        "app stats"
                    );
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
            }
        }
    })
}
