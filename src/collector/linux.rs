// Linux-specific helpers: /proc/meminfo, /proc/diskstats, interface speed.

/// Read Cached and Buffers from /proc/meminfo (Linux), in bytes.
pub(super) fn read_meminfo_cached_buffers() -> (Option<u64>, Option<u64>) {
    #[cfg(target_os = "linux")]
    {
        let mut cached = None;
        let mut buffers = None;
        if let Ok(text) = std::fs::read_to_string("/proc/meminfo") {
            for line in text.lines() {
                if line.starts_with("Cached:") {
                    cached = parse_meminfo_kib(line);
                } else if line.starts_with("Buffers:") {
                    buffers = parse_meminfo_kib(line);
                }
            }
        }
        return (cached, buffers);
    }
    #[cfg(not(target_os = "linux"))]
    (None, None)
}

#[cfg(target_os = "linux")]
fn parse_meminfo_kib(line: &str) -> Option<u64> {
    line.split_whitespace()
        .nth(1)
        .and_then(|kib| kib.parse::<u64>().ok())
        .map(|kib| kib * 1024)
}

/// Sum read/write byte totals over block devices from /proc/diskstats
/// (Linux). Sector counts are in 512-byte units regardless of device sector
/// size. Returns None where the file is unavailable.
pub(super) fn read_disk_io_totals() -> Option<(u64, u64)> {
    #[cfg(target_os = "linux")]
    {
        let text = std::fs::read_to_string("/proc/diskstats").ok()?;
        let mut read = 0u64;
        let mut write = 0u64;
        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                continue;
            }
            let name = fields[2];
            if name.starts_with("loop") || name.starts_with("ram") {
                continue;
            }
            if let (Ok(sectors_read), Ok(sectors_written)) =
                (fields[5].parse::<u64>(), fields[9].parse::<u64>())
            {
                read = read.saturating_add(sectors_read.saturating_mul(512));
                write = write.saturating_add(sectors_written.saturating_mul(512));
            }
        }
        return Some((read, write));
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Read network interface link speed from /sys/class/net/<interface>/speed
/// (Linux), in Mbps. None when the interface does not report one.
pub(super) fn interface_speed_mbps(interface_name: &str) -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let path = format!("/sys/class/net/{}/speed", interface_name);
        if let Ok(content) = std::fs::read_to_string(&path)
            && let Ok(mbps) = content.trim().parse::<i64>()
            && mbps > 0
        {
            return Some(mbps as u64);
        }
        return None;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = interface_name;
        None
    }
}
