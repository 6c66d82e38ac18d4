//! Per-process record produced by a backend on every cycle.
//!
//! On Linux the values come from `/proc/[pid]/stat`, `/proc/[pid]/status`,
//! `/proc/[pid]/io` and `/proc/[pid]/cmdline`.

use serde::{Deserialize, Serialize};

/// State character the kernel reports for a terminated, unreaped process.
pub const ZOMBIE_STATE: char = 'Z';

/// Identity a process runs with.
///
/// Source: `/proc/[pid]/status` (`Uid:` real/effective, `Gid:` real)
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Real user id.
    pub uid: u32,
    /// Effective user id.
    pub euid: u32,
    /// Real group id.
    pub gid: u32,
}

/// One sampled process.
///
/// `pid` is unique within a snapshot. `parent_pid` is reported as the kernel
/// gave it and is not checked for liveness: the parent may have exited or the
/// pid may have been reused between reads.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ProcessRecord {
    /// Process ID.
    pub pid: u32,

    /// Parent process ID.
    /// Source: `/proc/[pid]/stat` field 4 (ppid)
    pub parent_pid: u32,

    /// Short process name (up to 15 characters on Linux).
    /// Source: `/proc/[pid]/stat` field 2 (comm)
    pub name: String,

    /// Scheduler state character (`R`, `S`, `D`, `Z`, ...).
    /// Source: `/proc/[pid]/stat` field 3 (state)
    pub state: char,

    /// True if the process has terminated but was not reaped yet.
    pub is_zombie: bool,

    pub credentials: Credentials,

    /// Number of threads.
    /// Source: `/proc/[pid]/stat` field 20 (num_threads)
    pub thread_count: u32,

    /// User plus system CPU time, in clock ticks. Monotonic while the process lives.
    /// Source: `/proc/[pid]/stat` fields 14 (utime) + 15 (stime)
    pub cpu_time_ticks: u64,

    /// Resident set size in bytes.
    /// Source: `/proc/[pid]/stat` field 24 (rss) * page size
    pub memory_usage_bytes: u64,

    /// Bytes this process caused to be fetched from storage.
    /// `None` when the kernel has no per-process I/O accounting.
    /// Source: `/proc/[pid]/io` (read_bytes)
    pub io_read_bytes: Option<u64>,

    /// Bytes this process caused to be sent to storage.
    /// Source: `/proc/[pid]/io` (write_bytes)
    pub io_write_bytes: Option<u64>,

    /// Time the process started after system boot, in clock ticks.
    /// Source: `/proc/[pid]/stat` field 22 (starttime)
    pub start_time_ticks: u64,

    /// Seconds the process has been running. 0 when boot time is unknown.
    pub uptime_secs: u64,

    /// Full command line, only when collection was requested.
    pub command_line: Option<String>,
}

impl ProcessRecord {
    /// CPU time in seconds for a clock running at `clock_ticks` Hz.
    pub fn cpu_time_secs(&self, clock_ticks: u64) -> f64 {
        if clock_ticks == 0 {
            return 0.0;
        }
        self.cpu_time_ticks as f64 / clock_ticks as f64
    }

    /// Command line if collected, otherwise the short name.
    pub fn display_name(&self) -> &str {
        self.command_line.as_deref().unwrap_or(&self.name)
    }
}

/// Returns true iff `state` is the zombie marker.
pub fn is_zombie_state(state: char) -> bool {
    state == ZOMBIE_STATE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_time_secs() {
        let record = ProcessRecord {
            cpu_time_ticks: 250,
            ..ProcessRecord::default()
        };
        assert!((record.cpu_time_secs(100) - 2.5).abs() < f64::EPSILON);
        assert_eq!(record.cpu_time_secs(0), 0.0);
    }

    #[test]
    fn test_display_name_prefers_command_line() {
        let mut record = ProcessRecord {
            name: "bash".into(),
            ..ProcessRecord::default()
        };
        assert_eq!(record.display_name(), "bash");

        record.command_line = Some("/bin/bash --login".into());
        assert_eq!(record.display_name(), "/bin/bash --login");
    }
}
