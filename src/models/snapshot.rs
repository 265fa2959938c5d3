// Telemetry snapshot models: CPU, memory, disk, network

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuProcess {
    pub name: String,
    pub cpu_percent: f32,
    /// Resident memory in bytes.
    pub memory: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub global_percent: f32,
    pub per_core_percent: Vec<f32>,
    pub frequency_ghz: f32,
    pub cores: usize,
    /// Hottest component sensor, when any sensor reports one.
    pub temperature: Option<f32>,
    pub top_processes: Vec<CpuProcess>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemStats {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub cached: Option<u64>,
    pub buffers: Option<u64>,
    pub swap_total: u64,
    pub swap_used: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskPart {
    pub name: String,
    pub mount: String,
    pub filesystem: String,
    pub total: u64,
    pub used: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskStats {
    pub partitions: Vec<DiskPart>,
    /// Aggregate device I/O rates; None where the platform gives no counters.
    pub read_bytes_per_sec: Option<u64>,
    pub write_bytes_per_sec: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicStats {
    pub name: String,
    pub ipv4: Vec<String>,
    pub mac_address: String,
    pub speed_mbps: Option<u64>,
    pub rx_bytes_per_sec: u64,
    pub tx_bytes_per_sec: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
}

/// One immutable point-in-time measurement. Consumers replace the whole
/// value on every update; nothing mutates a snapshot after it is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: u64,
    pub cpu: CpuStats,
    pub mem: MemStats,
    pub disk: DiskStats,
    pub net: Vec<NicStats>,
}
