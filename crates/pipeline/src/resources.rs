//! Batch concurrency sizing from host resources.

use shelfstream_core::Platform;
use tracing::info;

use crate::health;

/// Hard upper bound on concurrent jobs regardless of hardware.
const MAX_CONCURRENCY: usize = 8;

/// Resident-set budget per encoder process, in GB.
const MEM_PER_JOB_GB: f64 = 2.0;

/// Compute a safe outer batch size. This bounds how many videos convert at
/// once, not how many qualities are encoded per video.
pub fn compute_concurrency(cpu_count: usize, free_mem_gb: f64, platform: Platform) -> usize {
    let by_cpu = cpu_count / 2;
    let by_mem = (free_mem_gb / MEM_PER_JOB_GB).floor() as usize;
    // Platforms that degrade under many concurrent encoder processes get
    // lower ceilings.
    let ceiling = match platform {
        Platform::MacOs => 3,
        Platform::Windows => 4,
        Platform::Linux | Platform::Other => MAX_CONCURRENCY,
    };
    by_cpu.min(by_mem).min(ceiling).clamp(1, MAX_CONCURRENCY)
}

/// Gather live inputs and compute the batch size for this host.
pub fn detect_concurrency() -> usize {
    let cpus = num_cpus::get();
    let free_mem_gb = health::available_mem_gb().unwrap_or(8.0);
    let platform = Platform::current();
    let concurrency = compute_concurrency(cpus, free_mem_gb, platform);
    info!(
        cpus,
        free_mem_gb, platform = %platform, concurrency, "computed batch concurrency"
    );
    concurrency
}
