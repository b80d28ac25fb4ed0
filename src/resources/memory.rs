use std::fs;

/// Source of resident-memory readings for the current process
pub trait MemorySampler: Send + Sync {
    /// Resident set size in bytes, or `None` where the platform offers none
    fn sample(&self) -> Option<u64>;
}

/// Reads `VmRSS` from `/proc/self/status`
///
/// Returns `None` on platforms without procfs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessMemorySampler;

impl MemorySampler for ProcessMemorySampler {
    fn sample(&self) -> Option<u64> {
        let status = fs::read_to_string("/proc/self/status").ok()?;
        parse_vm_rss(&status)
    }
}

/// Extracts the `VmRSS` line of a procfs status file, in bytes
pub fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let mut parts = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;

    let multiplier = match parts.next() {
        Some("kB") | Some("KB") | None => 1024,
        Some("mB") | Some("MB") => 1024 * 1024,
        Some(_) => return None,
    };

    Some(value * multiplier)
}

/// Formats a byte count as megabytes for log fields
pub(crate) fn as_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
