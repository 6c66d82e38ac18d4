//! Linux implementation of [`Backend`] over the procfs pseudo-filesystem.

use std::path::Path;

use tracing::{debug, error, info};

use crate::collector::error::SampleError;
use crate::collector::procfs::process::{CycleClock, ProcessCollector};
use crate::collector::procfs::system::SystemCollector;
use crate::collector::traits::{Backend, FileSystem, HostEnv};
use crate::model::{CpuSample, MemorySample, ProcessRecord, StaticInfo, SwapDevice};
use crate::rates::CpuRateEngine;

/// Sampling backend reading `/proc`.
///
/// The filesystem type doubles as the source of host constants, so tests run
/// the whole backend against a [`MockFs`](crate::collector::mock::MockFs).
pub struct ProcfsBackend<F: FileSystem + HostEnv + Clone> {
    fs: F,
    proc_path: String,
    process_collector: ProcessCollector<F>,
    system_collector: SystemCollector<F>,
    cpu_rates: CpuRateEngine,
    static_info: Option<StaticInfo>,
}

fn fatal(what: &str) -> SampleError {
    error!(what, "required host constant unavailable");
    SampleError::FatalInit(format!("{} unavailable", what))
}

impl<F: FileSystem + HostEnv + Clone> ProcfsBackend<F> {
    /// Creates a backend; call [`Backend::init`] before sampling.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        let proc_path = proc_path.into();
        Self {
            process_collector: ProcessCollector::new(fs.clone(), proc_path.clone()),
            system_collector: SystemCollector::new(fs.clone(), proc_path.clone()),
            fs,
            proc_path,
            cpu_rates: CpuRateEngine::new(),
            static_info: None,
        }
    }

    fn require_init(&self) -> Result<&StaticInfo, SampleError> {
        self.static_info.as_ref().ok_or(SampleError::NotInitialized)
    }

    /// Boot time for this cycle: now minus uptime, else the static `btime`.
    fn current_boot_epoch(&self, now: i64, fallback: u64) -> u64 {
        match self.system_collector.collect_uptime() {
            Ok(uptime) if uptime >= 0.0 => {
                u64::try_from(now.saturating_sub(uptime as i64)).unwrap_or(fallback)
            }
            Ok(_) => fallback,
            Err(e) => {
                debug!(error = %e, "uptime unavailable, using static boot time");
                fallback
            }
        }
    }

    fn read_static_info(&self) -> Result<StaticInfo, SampleError> {
        let clock_ticks = self
            .fs
            .clock_ticks()
            .filter(|&v| v > 0)
            .ok_or_else(|| fatal("clock ticks per second"))?;
        let page_size = self
            .fs
            .page_size()
            .filter(|&v| v > 0)
            .ok_or_else(|| fatal("page size"))?;
        let cpu_count = match self.fs.cpu_count() {
            Some(0) => {
                debug!("host reports 0 processors, assuming 1");
                1
            }
            Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => return Err(fatal("processor count")),
        };

        let total_memory_bytes = self.system_collector.collect_total_memory().map_err(|e| {
            error!(error = %e, "physical memory size unavailable");
            SampleError::FatalInit(format!("physical memory size unavailable: {}", e))
        })?;

        let boot_epoch_seconds = self.system_collector.collect_boot_time().unwrap_or_else(|| {
            debug!("boot time unavailable");
            0
        });

        let io_probe = format!("{}/self/io", self.proc_path);
        let has_io_statistics = self.fs.exists(Path::new(&io_probe));
        if !has_io_statistics {
            debug!("per-process io accounting not available");
        }

        Ok(StaticInfo {
            cpu_count,
            total_memory_bytes,
            boot_epoch_seconds,
            page_size_bytes: page_size as u64,
            clock_ticks_per_second: clock_ticks as u64,
            has_io_statistics,
        })
    }
}

impl<F: FileSystem + HostEnv + Clone> Backend for ProcfsBackend<F> {
    fn init(&mut self) -> Result<&StaticInfo, SampleError> {
        if self.static_info.is_some() {
            return self.require_init();
        }

        let info = self.read_static_info()?;
        info!(
            cpus = info.cpu_count,
            memory_bytes = info.total_memory_bytes,
            page_size = info.page_size_bytes,
            hz = info.clock_ticks_per_second,
            boot = info.boot_epoch_seconds,
            io_statistics = info.has_io_statistics,
            "procfs backend initialized"
        );
        self.process_collector.set_static_info(&info);
        Ok(&*self.static_info.insert(info))
    }

    fn static_info(&self) -> Option<&StaticInfo> {
        self.static_info.as_ref()
    }

    fn sample_processes(
        &mut self,
        collect_command_line: bool,
    ) -> Result<Vec<ProcessRecord>, SampleError> {
        let boot_fallback = self.require_init()?.boot_epoch_seconds;
        let now = Backend::now(self);
        let clock = CycleClock {
            now,
            boot_epoch: self.current_boot_epoch(now, boot_fallback),
        };
        self.process_collector
            .collect_all_processes(collect_command_line, clock)
    }

    fn sample_system_memory(&mut self) -> Result<MemorySample, SampleError> {
        let total = self.require_init()?.total_memory_bytes;
        self.system_collector.collect_memory(total)
    }

    fn sample_system_cpu(&mut self) -> Result<CpuSample, SampleError> {
        self.require_init()?;
        // A failed read leaves the previous baseline in place.
        let ticks = self.system_collector.collect_cpu_ticks()?;
        let usage = self.cpu_rates.update(ticks.into());
        Ok(CpuSample { ticks, usage })
    }

    fn load_average(&self, n: usize) -> Result<Vec<f64>, SampleError> {
        self.require_init()?;
        let n = n.min(3);
        if n == 0 {
            return Ok(Vec::new());
        }
        let load = self.system_collector.collect_loadavg()?;
        Ok(load[..n].to_vec())
    }

    fn sample_swap_devices(&mut self) -> Result<Vec<SwapDevice>, SampleError> {
        self.require_init()?;
        self.system_collector.collect_swap_devices()
    }

    fn now(&self) -> i64 {
        self.fs.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockHost};
    use crate::model::CpuUsage;

    fn backend(fs: MockFs) -> ProcfsBackend<MockFs> {
        ProcfsBackend::new(fs, "/proc")
    }

    #[test]
    fn test_init_reads_static_info() {
        let mut backend = backend(MockFs::typical_system());

        let info = backend.init().unwrap().clone();

        assert_eq!(info.cpu_count, 4);
        assert_eq!(info.total_memory_bytes, 16384000 * 1024);
        assert_eq!(info.boot_epoch_seconds, 1700000000);
        assert_eq!(info.page_size_bytes, 4096);
        assert_eq!(info.clock_ticks_per_second, 100);
        assert!(info.has_io_statistics);
        assert_eq!(backend.static_info(), Some(&info));
    }

    #[test]
    fn test_init_is_idempotent() {
        let fs = MockFs::typical_system();
        let mut backend = backend(fs.clone());

        let first = backend.init().unwrap().clone();
        let second = backend.init().unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(fs.read_count("/proc/meminfo"), 1);
    }

    #[test]
    fn test_init_fails_without_host_constants() {
        for host in [
            MockHost {
                clock_ticks: None,
                ..MockHost::default()
            },
            MockHost {
                page_size: Some(0),
                ..MockHost::default()
            },
            MockHost {
                cpu_count: None,
                ..MockHost::default()
            },
        ] {
            let mut fs = MockFs::typical_system();
            fs.set_host(host);
            let mut backend = backend(fs);

            let err = backend.init().unwrap_err();
            assert!(err.is_fatal(), "{host:?}");
            assert!(backend.static_info().is_none());
        }
    }

    #[test]
    fn test_init_fails_without_total_memory() {
        let mut fs = MockFs::typical_system();
        fs.add_file("/proc/meminfo", "MemFree: 100 kB\n");

        let err = backend(fs).init().unwrap_err();
        assert!(matches!(err, SampleError::FatalInit(_)));
    }

    #[test]
    fn test_init_zero_cpus_means_one() {
        let mut fs = MockFs::typical_system();
        fs.set_host(MockHost {
            cpu_count: Some(0),
            ..MockHost::default()
        });

        let mut backend = backend(fs);
        assert_eq!(backend.init().unwrap().cpu_count, 1);
    }

    #[test]
    fn test_init_without_boot_time() {
        let mut fs = MockFs::typical_system();
        fs.add_file("/proc/stat", "cpu  1 2 3 4 5 6 7\n");

        let mut backend = backend(fs);
        assert_eq!(backend.init().unwrap().boot_epoch_seconds, 0);
    }

    #[test]
    fn test_sampling_requires_init() {
        let mut backend = backend(MockFs::typical_system());

        assert!(matches!(
            backend.sample_processes(false),
            Err(SampleError::NotInitialized)
        ));
        assert!(matches!(
            backend.sample_system_memory(),
            Err(SampleError::NotInitialized)
        ));
        assert!(matches!(
            backend.sample_system_cpu(),
            Err(SampleError::NotInitialized)
        ));
        assert!(matches!(
            backend.load_average(3),
            Err(SampleError::NotInitialized)
        ));
    }

    #[test]
    fn test_sample_processes() {
        let mut backend = backend(MockFs::typical_system());
        backend.init().unwrap();

        let processes = backend.sample_processes(true).unwrap();

        assert_eq!(processes.len(), 3);
        let init = &processes[0];
        assert_eq!(init.pid, 1);
        assert_eq!(init.command_line.as_deref(), Some("/sbin/init splash"));
        assert_eq!(init.io_read_bytes, Some(4096));
        // Boot derived from uptime: now - 12345 = 1700000000.
        let bash = &processes[1];
        assert_eq!(bash.uptime_secs, 11345);
    }

    #[test]
    fn test_sample_processes_old_kernel_has_no_io() {
        let fs = MockFs::old_kernel();
        let mut backend = backend(fs.clone());
        assert!(!backend.init().unwrap().has_io_statistics);

        let processes = backend.sample_processes(false).unwrap();
        assert!(processes.iter().all(|p| p.io_read_bytes.is_none()));
        assert_eq!(fs.read_count("/proc/1/io"), 0);
    }

    #[test]
    fn test_sample_processes_uses_static_boot_without_uptime() {
        let mut fs = MockFs::typical_system();
        fs.remove_file("/proc/uptime");
        let mut backend = backend(fs);
        backend.init().unwrap();

        let processes = backend.sample_processes(false).unwrap();
        assert_eq!(processes[1].uptime_secs, 11345);
    }

    #[test]
    fn test_sample_system_memory() {
        let mut backend = backend(MockFs::typical_system());
        backend.init().unwrap();

        let memory = backend.sample_system_memory().unwrap();
        assert_eq!(memory.memory_used_bytes, 5376000 * 1024);
        assert_eq!(memory.swap_used_bytes, 1024000 * 1024);
    }

    #[test]
    fn test_sample_system_cpu_first_call_is_unavailable() {
        let mut backend = backend(MockFs::typical_system());
        backend.init().unwrap();

        let sample = backend.sample_system_cpu().unwrap();
        assert_eq!(sample.usage, CpuUsage::unavailable());
        assert_eq!(sample.ticks.user, 10000);
    }

    #[test]
    fn test_cpu_failure_keeps_history() {
        let mut fs = MockFs::typical_system();
        let typical = "cpu  10000 500 3000 80000 1000 200 100\nbtime 1700000000\n";
        fs.queue_reads(
            "/proc/stat",
            [
                typical,
                typical,
                "garbage\n",
                "cpu  10040 500 3016 80040 1004 200 100\n",
            ],
        );
        let mut backend = backend(fs);
        backend.init().unwrap();

        assert!(!backend.sample_system_cpu().unwrap().usage.is_available());
        assert!(backend.sample_system_cpu().is_err());

        let usage = backend.sample_system_cpu().unwrap().usage;
        assert_eq!(usage.user, 40.0);
        assert_eq!(usage.system, 16.0);
        assert_eq!(usage.wait, 4.0);
    }

    #[test]
    fn test_independent_backends_do_not_share_history() {
        let mut first = backend(MockFs::typical_system());
        let mut second = backend(MockFs::typical_system());
        first.init().unwrap();
        second.init().unwrap();

        first.sample_system_cpu().unwrap();
        assert!(!second.sample_system_cpu().unwrap().usage.is_available());
    }

    #[test]
    fn test_load_average_clamps_count() {
        let mut backend = backend(MockFs::typical_system());
        backend.init().unwrap();

        assert_eq!(backend.load_average(0).unwrap(), Vec::<f64>::new());
        assert_eq!(backend.load_average(1).unwrap(), vec![0.15]);
        assert_eq!(backend.load_average(7).unwrap(), vec![0.15, 0.10, 0.05]);
    }

    #[test]
    fn test_sample_swap_devices() {
        let mut backend = backend(MockFs::typical_system());
        backend.init().unwrap();

        let devices = backend.sample_swap_devices().unwrap();
        assert_eq!(devices.len(), 1);
    }
}
