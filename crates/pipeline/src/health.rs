//! Advisory host health checks. These only warn or pause scheduling; they
//! never fail completed work.

use std::path::Path;

/// Free space below this many GB is worth a warning.
const LOW_DISK_GB: f64 = 10.0;

/// Free space below this many GB halts further scheduling.
const CRITICAL_DISK_GB: f64 = 2.0;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskStatus {
    Ok,
    Low,
    Critical,
}

pub fn classify_disk(free_gb: f64) -> DiskStatus {
    if free_gb < CRITICAL_DISK_GB {
        DiskStatus::Critical
    } else if free_gb < LOW_DISK_GB {
        DiskStatus::Low
    } else {
        DiskStatus::Ok
    }
}

/// Disk status for the filesystem holding `path`. Unknown measures as Ok;
/// an advisory check must not block platforms it cannot read.
pub fn disk_status(path: &Path) -> DiskStatus {
    match free_disk_gb(path) {
        Some(free_gb) => classify_disk(free_gb),
        None => DiskStatus::Ok,
    }
}

#[cfg(unix)]
pub fn free_disk_gb(path: &Path) -> Option<f64> {
    let stat = nix::sys::statvfs::statvfs(path).ok()?;
    let bytes = stat.blocks_available() as u64 * stat.fragment_size() as u64;
    Some(bytes as f64 / BYTES_PER_GB)
}

#[cfg(not(unix))]
pub fn free_disk_gb(_path: &Path) -> Option<f64> {
    None
}

/// Available memory in GB, from /proc/meminfo.
#[cfg(target_os = "linux")]
pub fn available_mem_gb() -> Option<f64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    let line = meminfo.lines().find(|l| l.starts_with("MemAvailable:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb as f64 / 1024.0 / 1024.0)
}

#[cfg(not(target_os = "linux"))]
pub fn available_mem_gb() -> Option<f64> {
    None
}
