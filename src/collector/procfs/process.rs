//! Process collector for gathering per-process records from `/proc/[pid]/`.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::collector::error::SampleError;
use crate::collector::procfs::parser::{
    ParseError, parse_cmdline, parse_proc_io, parse_proc_stat, parse_status_credentials,
};
use crate::collector::traits::FileSystem;
use crate::model::{ProcessRecord, StaticInfo, is_zombie_state};

/// Why a single process was left out of a snapshot.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Process disappeared (or became unreadable) during collection.
    #[error("process {0} disappeared")]
    ProcessGone(u32),
    /// A required field in one of the process files did not parse.
    #[error("process {pid}: bad {file}: {source}")]
    Parse {
        pid: u32,
        file: &'static str,
        #[source]
        source: ParseError,
    },
}

/// Time reference for one enumeration pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleClock {
    /// Wall clock in seconds since the epoch.
    pub now: i64,
    /// Boot time in seconds since the epoch, 0 if unknown.
    pub boot_epoch: u64,
}

/// Collects process records from `/proc/[pid]/` files.
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
    page_size: u64,
    clock_ticks: u64,
    has_io_statistics: bool,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            page_size: 4096,
            clock_ticks: 100,
            has_io_statistics: false,
        }
    }

    /// Applies the constants read by static init.
    ///
    /// Must be called before `collect_process()` or `collect_all_processes()`.
    pub fn set_static_info(&mut self, info: &StaticInfo) {
        self.page_size = info.page_size_bytes;
        self.clock_ticks = info.clock_ticks_per_second.max(1);
        self.has_io_statistics = info.has_io_statistics;
    }

    /// Seconds between process start and `clock.now`; 0 without a boot time.
    fn uptime_secs(&self, starttime_ticks: u64, clock: CycleClock) -> u64 {
        if clock.boot_epoch == 0 {
            return 0;
        }
        let started = clock.boot_epoch.saturating_add(starttime_ticks / self.clock_ticks);
        u64::try_from(clock.now)
            .unwrap_or(0)
            .saturating_sub(started)
    }

    /// Collects the record of a single process.
    pub fn collect_process(
        &self,
        pid: u32,
        collect_command_line: bool,
        clock: CycleClock,
    ) -> Result<ProcessRecord, CollectError> {
        let proc_dir = format!("{}/{}", self.proc_path, pid);

        // Read /proc/[pid]/stat
        let stat_content = self
            .fs
            .read_to_string(Path::new(&format!("{}/stat", proc_dir)))
            .map_err(|_| CollectError::ProcessGone(pid))?;
        let stat = parse_proc_stat(&stat_content).map_err(|source| CollectError::Parse {
            pid,
            file: "stat",
            source,
        })?;

        // Read /proc/[pid]/status
        let status_content = self
            .fs
            .read_to_string(Path::new(&format!("{}/status", proc_dir)))
            .map_err(|_| CollectError::ProcessGone(pid))?;
        let credentials =
            parse_status_credentials(&status_content).map_err(|source| CollectError::Parse {
                pid,
                file: "status",
                source,
            })?;

        // Read /proc/[pid]/io (optional, may fail due to permissions)
        let (io_read_bytes, io_write_bytes) = if self.has_io_statistics {
            match self
                .fs
                .read_to_string(Path::new(&format!("{}/io", proc_dir)))
            {
                Ok(content) => {
                    let io = parse_proc_io(&content);
                    if io.read_bytes.is_none() || io.write_bytes.is_none() {
                        debug!(pid, "io counters incomplete");
                    }
                    (io.read_bytes, io.write_bytes)
                }
                Err(e) => {
                    debug!(pid, error = %e, "io counters unreadable");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        // Read /proc/[pid]/cmdline
        let command_line = if collect_command_line {
            match self.fs.read(Path::new(&format!("{}/cmdline", proc_dir))) {
                Ok(buf) => Some(parse_cmdline(&buf, &stat.comm)),
                Err(e) => {
                    debug!(pid, error = %e, "command line unreadable");
                    None
                }
            }
        } else {
            None
        };

        Ok(ProcessRecord {
            pid: stat.pid,
            parent_pid: stat.ppid,
            is_zombie: is_zombie_state(stat.state),
            state: stat.state,
            credentials,
            thread_count: u32::try_from(stat.num_threads.max(0)).unwrap_or(u32::MAX),
            cpu_time_ticks: stat.utime + stat.stime,
            memory_usage_bytes: (stat.rss.max(0) as u64).saturating_mul(self.page_size),
            io_read_bytes,
            io_write_bytes,
            start_time_ticks: stat.starttime,
            uptime_secs: self.uptime_secs(stat.starttime, clock),
            command_line,
            name: stat.comm,
        })
    }

    /// Collects records of all processes, sorted by pid.
    ///
    /// Processes that disappear or carry unparsable required fields are
    /// skipped; only a failure to list the proc directory is an error.
    pub fn collect_all_processes(
        &self,
        collect_command_line: bool,
        clock: CycleClock,
    ) -> Result<Vec<ProcessRecord>, SampleError> {
        let proc_path = Path::new(&self.proc_path);
        let entries = self
            .fs
            .read_dir(proc_path)
            .map_err(|e| SampleError::io(proc_path, e))?;

        let mut processes = Vec::with_capacity(entries.len());
        let mut skipped = 0usize;

        for entry in entries {
            // Check if entry is a PID directory (numeric name)
            if let Some(name) = entry.file_name().and_then(|n| n.to_str())
                && let Ok(pid) = name.parse::<u32>()
            {
                match self.collect_process(pid, collect_command_line, clock) {
                    Ok(record) => processes.push(record),
                    Err(e) => {
                        skipped += 1;
                        debug!(pid, error = %e, "skipping process");
                    }
                }
            }
        }

        processes.sort_unstable_by_key(|p| p.pid);
        debug!(
            collected = processes.len(),
            skipped, "process enumeration finished"
        );
        Ok(processes)
    }
}
