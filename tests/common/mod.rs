// Shared test helpers

use dashcore::models::*;

/// Minimal snapshot distinguishable by timestamp.
#[allow(dead_code)]
pub fn snapshot(timestamp: u64) -> Snapshot {
    Snapshot {
        timestamp,
        cpu: CpuStats {
            global_percent: 0.0,
            per_core_percent: vec![],
            frequency_ghz: 0.0,
            cores: 0,
            temperature: None,
            top_processes: vec![],
        },
        mem: MemStats {
            total: 0,
            used: 0,
            available: 0,
            cached: None,
            buffers: None,
            swap_total: 0,
            swap_used: 0,
        },
        disk: DiskStats {
            partitions: vec![],
            read_bytes_per_sec: None,
            write_bytes_per_sec: None,
        },
        net: vec![],
    }
}

#[allow(dead_code)]
pub fn shortcut(id: &str, name: &str) -> Shortcut {
    Shortcut {
        id: id.into(),
        name: name.into(),
        command: format!("https://{name}.example.com"),
        kind: "website".into(),
        icon: Some("globe".into()),
        custom_image: None,
    }
}
