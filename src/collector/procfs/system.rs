//! System collector for gathering host-wide metrics from `/proc/`.

use std::path::Path;

use tracing::{debug, warn};

use crate::collector::error::SampleError;
use crate::collector::procfs::parser::{
    count_swap_entries, parse_arcstats_size, parse_btime, parse_cpu_ticks, parse_loadavg,
    parse_meminfo, parse_swaps, parse_uptime,
};
use crate::collector::retry::{TableRead, read_resizable_table};
use crate::collector::traits::FileSystem;
use crate::model::{CpuTicks, MemorySample, SwapDevice};

/// How many times the swap table is re-read after it changed size.
pub const MAX_SWAP_TABLE_ATTEMPTS: usize = 3;

/// Multiplier from meminfo units (kB) to bytes.
const MEMINFO_UNIT: u64 = 1024;

/// Used memory in bytes, saturating at 0.
///
/// `free`, `buffers`, `cache` and `reclaimable` are in `unit`-sized blocks;
/// `total` and `arc` are bytes.
pub fn memory_used_bytes(
    total: u64,
    arc: u64,
    free: u64,
    buffers: u64,
    cache: u64,
    reclaimable: u64,
    unit: u64,
) -> u64 {
    let reclaimable_bytes = free
        .saturating_add(buffers)
        .saturating_add(cache)
        .saturating_add(reclaimable)
        .saturating_mul(unit);
    total.saturating_sub(arc).saturating_sub(reclaimable_bytes)
}

/// Collects system-wide metrics from `/proc/`.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn read(&self, name: &str) -> Result<String, SampleError> {
        let path = format!("{}/{}", self.proc_path, name);
        self.fs
            .read_to_string(Path::new(&path))
            .map_err(|e| SampleError::io(path, e))
    }

    /// Physical memory in bytes from `MemTotal`.
    pub fn collect_total_memory(&self) -> Result<u64, SampleError> {
        let info = parse_meminfo(&self.read("meminfo")?);
        info.mem_total
            .map(|kb| kb.saturating_mul(MEMINFO_UNIT))
            .ok_or_else(|| SampleError::missing("meminfo", "MemTotal"))
    }

    /// Boot time in seconds since the epoch from `btime`, if present.
    pub fn collect_boot_time(&self) -> Option<u64> {
        match self.read("stat") {
            Ok(content) => parse_btime(&content),
            Err(e) => {
                debug!(error = %e, "boot time unavailable");
                None
            }
        }
    }

    /// Seconds since boot from `/proc/uptime`.
    pub fn collect_uptime(&self) -> Result<f64, SampleError> {
        parse_uptime(&self.read("uptime")?).map_err(|e| {
            debug!(error = %e, "bad uptime");
            SampleError::missing("uptime", "seconds")
        })
    }

    /// ZFS ARC size in bytes; 0 when there is no ARC.
    pub fn collect_arc_size(&self) -> u64 {
        let path = format!("{}/spl/kstat/zfs/arcstats", self.proc_path);
        let path = Path::new(&path);
        if !self.fs.exists(path) {
            return 0;
        }
        match self.fs.read_to_string(path) {
            Ok(content) => parse_arcstats_size(&content).unwrap_or_else(|| {
                debug!("arcstats has no size");
                0
            }),
            Err(e) => {
                debug!(error = %e, "arcstats unreadable");
                0
            }
        }
    }

    /// Collects used memory and swap from `/proc/meminfo`.
    ///
    /// `MemFree`, `SwapTotal` and `SwapFree` are required; `Buffers`, `Cached`
    /// and `SReclaimable` count as 0 when missing.
    pub fn collect_memory(&self, total_memory_bytes: u64) -> Result<MemorySample, SampleError> {
        let info = parse_meminfo(&self.read("meminfo")?);

        let free = info
            .mem_free
            .ok_or_else(|| SampleError::missing("meminfo", "MemFree"))?;
        let swap_total = info
            .swap_total
            .ok_or_else(|| SampleError::missing("meminfo", "SwapTotal"))?;
        let swap_free = info
            .swap_free
            .ok_or_else(|| SampleError::missing("meminfo", "SwapFree"))?;

        let optional = |value: Option<u64>, field: &str| {
            value.unwrap_or_else(|| {
                debug!(field, "optional meminfo field missing");
                0
            })
        };
        let buffers = optional(info.buffers, "Buffers");
        let cached = optional(info.cached, "Cached");
        let reclaimable = optional(info.s_reclaimable, "SReclaimable");

        let swap_total_bytes = swap_total.saturating_mul(MEMINFO_UNIT);
        Ok(MemorySample {
            memory_used_bytes: memory_used_bytes(
                total_memory_bytes,
                self.collect_arc_size(),
                free,
                buffers,
                cached,
                reclaimable,
                MEMINFO_UNIT,
            ),
            swap_total_bytes,
            swap_used_bytes: swap_total_bytes
                .saturating_sub(swap_free.saturating_mul(MEMINFO_UNIT)),
        })
    }

    /// Collects cumulative CPU ticks from the aggregate `cpu` line of `/proc/stat`.
    pub fn collect_cpu_ticks(&self) -> Result<CpuTicks, SampleError> {
        parse_cpu_ticks(&self.read("stat")?).map_err(|e| {
            warn!(error = %e, "cpu counters unavailable");
            SampleError::missing("stat", "cpu")
        })
    }

    /// Collects the 1, 5 and 15 minute load averages from `/proc/loadavg`.
    pub fn collect_loadavg(&self) -> Result<[f64; 3], SampleError> {
        parse_loadavg(&self.read("loadavg")?).map_err(|e| {
            warn!(error = %e, "load average unavailable");
            SampleError::missing("loadavg", "averages")
        })
    }

    /// Collects active swap areas from `/proc/swaps`.
    ///
    /// The entry count is read first and the table is then decoded for that
    /// count. A table that gained entries in between is read again, at most
    /// [`MAX_SWAP_TABLE_ATTEMPTS`] times.
    pub fn collect_swap_devices(&self) -> Result<Vec<SwapDevice>, SampleError> {
        let table = read_resizable_table(
            MAX_SWAP_TABLE_ATTEMPTS,
            || self.read("swaps").map(|content| count_swap_entries(&content)),
            |capacity| {
                let devices = parse_swaps(&self.read("swaps")?).map_err(|e| {
                    warn!(error = %e, "bad swaps table");
                    SampleError::missing("swaps", "entries")
                })?;
                if devices.len() > capacity {
                    Ok(TableRead::Grew {
                        reported: devices.len(),
                    })
                } else {
                    Ok(TableRead::Complete(devices))
                }
            },
        )?;

        table.ok_or_else(|| {
            warn!(
                attempts = MAX_SWAP_TABLE_ATTEMPTS,
                "swap table kept changing size"
            );
            SampleError::missing("swaps", "entries")
        })
    }
}
