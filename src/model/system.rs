//! Host-wide values: static constants captured at init and per-cycle samples.

use serde::{Deserialize, Serialize};

/// Values read once by `init()` and treated as immutable afterwards.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct StaticInfo {
    /// Configured logical CPUs (never 0).
    pub cpu_count: u32,
    /// Physical memory in bytes.
    /// Source: `/proc/meminfo` (MemTotal) * 1024
    pub total_memory_bytes: u64,
    /// Boot time in seconds since the Unix epoch, 0 if unknown.
    /// Source: `/proc/stat` (btime)
    pub boot_epoch_seconds: u64,
    pub page_size_bytes: u64,
    pub clock_ticks_per_second: u64,
    /// Whether the kernel exposes per-process I/O counters.
    pub has_io_statistics: bool,
}

/// Result of one system memory sample.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct MemorySample {
    pub memory_used_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
}

/// Cumulative CPU tick counters by category.
///
/// Categories a platform does not report are 0.
/// Source: `/proc/stat` (aggregate `cpu` line)
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
}

impl CpuTicks {
    /// Sum of all categories.
    pub fn total(&self) -> u64 {
        self.user
            .wrapping_add(self.nice)
            .wrapping_add(self.system)
            .wrapping_add(self.idle)
            .wrapping_add(self.iowait)
            .wrapping_add(self.irq)
            .wrapping_add(self.softirq)
    }
}

/// CPU usage percentages over the last interval.
///
/// Each field is [`CpuUsage::UNAVAILABLE`] until two usable samples exist.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct CpuUsage {
    pub user: f64,
    pub system: f64,
    pub wait: f64,
}

impl CpuUsage {
    /// Sentinel for "not yet available".
    pub const UNAVAILABLE: f64 = -1.0;

    pub const fn unavailable() -> Self {
        Self {
            user: Self::UNAVAILABLE,
            system: Self::UNAVAILABLE,
            wait: Self::UNAVAILABLE,
        }
    }

    /// Zeroed usage written when a CPU sample fails.
    pub const fn zeroed() -> Self {
        Self {
            user: 0.0,
            system: 0.0,
            wait: 0.0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.user != Self::UNAVAILABLE
    }
}

impl Default for CpuUsage {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Result of one system CPU sample.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct CpuSample {
    pub ticks: CpuTicks,
    pub usage: CpuUsage,
}

/// One active swap area.
/// Source: `/proc/swaps`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct SwapDevice {
    pub path: String,
    /// `partition` or `file`.
    pub kind: String,
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub priority: i32,
}

/// Host-wide view produced once per cycle.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct SystemSnapshot {
    pub cpu_count: u32,
    pub total_memory_bytes: u64,
    pub boot_epoch_seconds: u64,
    pub page_size_bytes: u64,
    pub clock_ticks_per_second: u64,

    pub memory_used_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,

    pub cpu_user_pct: f64,
    pub cpu_system_pct: f64,
    pub cpu_wait_pct: f64,

    /// 1, 5 and 15 minute load averages (zeros if unavailable).
    pub load_average: [f64; 3],

    /// Active swap areas; only collected when swap is configured.
    pub swap_devices: Vec<SwapDevice>,
}

impl SystemSnapshot {
    /// Starts a snapshot from the static values; per-cycle fields are zero.
    pub fn from_static(info: &StaticInfo) -> Self {
        Self {
            cpu_count: info.cpu_count,
            total_memory_bytes: info.total_memory_bytes,
            boot_epoch_seconds: info.boot_epoch_seconds,
            page_size_bytes: info.page_size_bytes,
            clock_ticks_per_second: info.clock_ticks_per_second,
            ..Self::default()
        }
    }

    pub fn apply_memory(&mut self, sample: &MemorySample) {
        self.memory_used_bytes = sample.memory_used_bytes;
        self.swap_total_bytes = sample.swap_total_bytes;
        self.swap_used_bytes = sample.swap_used_bytes;
    }

    pub fn apply_cpu(&mut self, usage: &CpuUsage) {
        self.cpu_user_pct = usage.user;
        self.cpu_system_pct = usage.system;
        self.cpu_wait_pct = usage.wait;
    }

    /// Used memory as a percentage of physical memory.
    pub fn memory_usage_percent(&self) -> f64 {
        percent(self.memory_used_bytes, self.total_memory_bytes)
    }

    /// Used swap as a percentage of configured swap. 0 without swap.
    pub fn swap_usage_percent(&self) -> f64 {
        percent(self.swap_used_bytes, self.swap_total_bytes)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}
