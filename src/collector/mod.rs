// System snapshot collection via sysinfo

mod linux;

use crate::models::*;
use crate::sync::SnapshotSource;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{Components, Disks, Networks, ProcessesToUpdate, System};
use tracing::instrument;

/// Counter baselines from the previous read, for rate computation.
struct PrevCounters {
    at: Instant,
    /// Interface name -> (rx bytes total, tx bytes total).
    nic_bytes: HashMap<String, (u64, u64)>,
    /// (read bytes total, write bytes total), where the platform exposes them.
    disk_bytes: Option<(u64, u64)>,
}

pub struct Collector {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    networks: Arc<Mutex<Networks>>,
    prev: Arc<Mutex<Option<PrevCounters>>>,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(disks)),
            networks: Arc::new(Mutex::new(networks)),
            prev: Arc::new(Mutex::new(None)),
        }
    }

    /// Builds one full snapshot. Rates (disk I/O, per-NIC throughput) come
    /// from counter deltas against the previous read; the first read reports
    /// them as zero or absent.
    #[instrument(skip(self), fields(repo = "collector", operation = "read_once"))]
    pub async fn read_once(&self) -> anyhow::Result<Snapshot> {
        let sys = self.sys.clone();
        let disks = self.disks.clone();
        let networks = self.networks.clone();
        let prev = self.prev.clone();
        tokio::task::spawn_blocking(move || {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
                    0
                });

            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("collector lock poisoned: {}", e))?;
            sys.refresh_cpu_all();
            sys.refresh_memory();
            sys.refresh_processes(ProcessesToUpdate::All, true);

            let per_core_percent: Vec<f32> = sys.cpus().iter().map(|c| c.cpu_usage()).collect();
            let global_percent = sys.global_cpu_usage();
            let frequency_ghz = if sys.cpus().is_empty() {
                0.0
            } else {
                let avg_mhz = sys.cpus().iter().map(|c| c.frequency() as f32).sum::<f32>()
                    / sys.cpus().len() as f32;
                avg_mhz / 1000.0
            };

            let mut temperature: Option<f32> = None;
            let mut components = Components::new_with_refreshed_list();
            for c in &mut components {
                c.refresh();
                if let Some(t) = c.temperature() {
                    temperature = Some(temperature.map_or(t, |m| m.max(t)));
                }
            }

            let mut top_processes: Vec<CpuProcess> = sys
                .processes()
                .values()
                .map(|p| CpuProcess {
                    name: p.name().to_str().unwrap_or("N/A").into(),
                    cpu_percent: p.cpu_usage(),
                    memory: p.memory(),
                })
                .collect();
            top_processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
            top_processes.truncate(per_core_percent.len());

            let cpu = CpuStats {
                global_percent,
                per_core_percent,
                frequency_ghz,
                cores: sys.cpus().len(),
                temperature,
                top_processes,
            };

            let (cached, buffers) = linux::read_meminfo_cached_buffers();
            let mem = MemStats {
                total: sys.total_memory(),
                used: sys.used_memory(),
                available: sys.available_memory(),
                cached,
                buffers,
                swap_total: sys.total_swap(),
                swap_used: sys.used_swap(),
            };

            let mut disks_guard = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("collector disks lock poisoned: {}", e))?;
            disks_guard.refresh(false);
            let partitions: Vec<DiskPart> = disks_guard
                .list()
                .iter()
                .map(|d| {
                    let total = d.total_space();
                    DiskPart {
                        name: d.name().to_string_lossy().into_owned(),
                        mount: d.mount_point().to_string_lossy().into_owned(),
                        filesystem: d.file_system().to_string_lossy().into_owned(),
                        total,
                        used: total.saturating_sub(d.available_space()),
                    }
                })
                .collect();
            drop(disks_guard);

            let disk_totals = linux::read_disk_io_totals();

            let mut networks_guard = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("collector networks lock poisoned: {}", e))?;
            networks_guard.refresh(true);
            let now = Instant::now();
            let mut nic_counters: HashMap<String, (u64, u64)> = HashMap::new();
            let mut net: Vec<NicStats> = networks_guard
                .list()
                .iter()
                .map(|(name, data)| {
                    nic_counters.insert(
                        name.clone(),
                        (data.total_received(), data.total_transmitted()),
                    );
                    NicStats {
                        name: name.clone(),
                        ipv4: data
                            .ip_networks()
                            .iter()
                            .filter(|n| n.addr.is_ipv4())
                            .map(|n| n.addr.to_string())
                            .collect(),
                        mac_address: data.mac_address().to_string(),
                        speed_mbps: linux::interface_speed_mbps(name),
                        rx_bytes_per_sec: 0,
                        tx_bytes_per_sec: 0,
                        rx_packets: data.total_packets_received(),
                        tx_packets: data.total_packets_transmitted(),
                    }
                })
                .collect();
            drop(networks_guard);

            let mut read_bytes_per_sec = None;
            let mut write_bytes_per_sec = None;
            if let Ok(mut prev_guard) = prev.lock() {
                if let Some(p) = prev_guard.as_ref() {
                    let dt = now.duration_since(p.at).as_secs_f64().max(0.001);
                    for nic in &mut net {
                        if let (Some((rx_now, tx_now)), Some((rx_prev, tx_prev))) =
                            (nic_counters.get(&nic.name), p.nic_bytes.get(&nic.name))
                        {
                            nic.rx_bytes_per_sec =
                                (rx_now.saturating_sub(*rx_prev) as f64 / dt) as u64;
                            nic.tx_bytes_per_sec =
                                (tx_now.saturating_sub(*tx_prev) as f64 / dt) as u64;
                        }
                    }
                    if let (Some((read, write)), Some((read_prev, write_prev))) =
                        (disk_totals, p.disk_bytes)
                    {
                        read_bytes_per_sec =
                            Some((read.saturating_sub(read_prev) as f64 / dt) as u64);
                        write_bytes_per_sec =
                            Some((write.saturating_sub(write_prev) as f64 / dt) as u64);
                    }
                }
                *prev_guard = Some(PrevCounters {
                    at: now,
                    nic_bytes: nic_counters,
                    disk_bytes: disk_totals,
                });
            }

            Ok(Snapshot {
                timestamp,
                cpu,
                mem,
                disk: DiskStats {
                    partitions,
                    read_bytes_per_sec,
                    write_bytes_per_sec,
                },
                net,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("collector task join: {}", e))?
    }
}

impl SnapshotSource for Collector {
    fn pull_once(&self) -> impl Future<Output = anyhow::Result<Snapshot>> + Send {
        self.read_once()
    }
}
