//! Abstractions over the host interfaces the sampler reads from.
//!
//! The `FileSystem` trait lets the procfs backend read either the real `/proc`
//! pseudo-filesystem or an in-memory mock. `HostEnv` supplies the constants a
//! process learns from `sysconf(3)` plus the wall clock, so static init can be
//! driven from tests as well. `Backend` is the per-platform capability set the
//! sampler is generic over.

use std::io;
use std::path::{Path, PathBuf};

use crate::collector::error::SampleError;
use crate::model::{CpuSample, MemorySample, ProcessRecord, StaticInfo, SwapDevice};

/// Abstraction for filesystem operations.
///
/// Every call is a scoped acquisition: the implementation opens, reads and
/// closes the file before returning, on success and on error alike.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Reads the entire contents of a file as raw bytes.
    ///
    /// Needed for interfaces like `/proc/[pid]/cmdline` whose content is a
    /// NUL-separated buffer that is not guaranteed to be valid UTF-8.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Host constants that never change while the process lives, plus a clock.
pub trait HostEnv: Send + Sync {
    /// Clock ticks per second (`_SC_CLK_TCK`).
    fn clock_ticks(&self) -> Option<i64>;

    /// Memory page size in bytes (`_SC_PAGESIZE`).
    fn page_size(&self) -> Option<i64>;

    /// Number of configured logical processors (`_SC_NPROCESSORS_CONF`).
    fn cpu_count(&self) -> Option<i64>;

    /// Current wall clock time in seconds since the Unix epoch.
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Real filesystem implementation that delegates to `std::fs`.
///
/// Use this in production to read from the actual `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

fn sysconf(name: libc::c_int) -> Option<i64> {
    // SAFETY: sysconf only inspects its integer argument and has no
    // memory-safety preconditions.
    let value = unsafe { libc::sysconf(name) };
    (value >= 0).then_some(value as i64)
}

impl HostEnv for RealFs {
    fn clock_ticks(&self) -> Option<i64> {
        sysconf(libc::_SC_CLK_TCK)
    }

    fn page_size(&self) -> Option<i64> {
        sysconf(libc::_SC_PAGESIZE)
    }

    fn cpu_count(&self) -> Option<i64> {
        sysconf(libc::_SC_NPROCESSORS_CONF)
    }
}

/// Capability set implemented once per operating system family.
///
/// Exactly one implementation is active in a running sampler; it is chosen at
/// build time through the sampler's type parameter. Implementations hold the
/// CPU rate history, so one instance must not be driven by two threads at once.
pub trait Backend {
    /// Reads the static host constants. Must succeed before any sampling call.
    ///
    /// Calling it again after a success returns the cached values.
    fn init(&mut self) -> Result<&StaticInfo, SampleError>;

    /// Static values captured by a successful `init`.
    fn static_info(&self) -> Option<&StaticInfo>;

    /// Enumerates all visible processes.
    ///
    /// A process whose required fields cannot be read is skipped; only a
    /// failure to enumerate at all is returned as an error.
    fn sample_processes(
        &mut self,
        collect_command_line: bool,
    ) -> Result<Vec<ProcessRecord>, SampleError>;

    /// Samples used memory and swap.
    fn sample_system_memory(&mut self) -> Result<MemorySample, SampleError>;

    /// Samples CPU tick counters and converts them to percentages.
    fn sample_system_cpu(&mut self) -> Result<CpuSample, SampleError>;

    /// Returns up to `n` (at most 3) load averages: 1, 5 and 15 minutes.
    fn load_average(&self, n: usize) -> Result<Vec<f64>, SampleError>;

    /// Lists active swap devices. Backends without a swap table return nothing.
    fn sample_swap_devices(&mut self) -> Result<Vec<SwapDevice>, SampleError> {
        Ok(Vec::new())
    }

    /// Wall clock used to stamp cycles and derive process uptimes.
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_real_fs_read_to_string() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        let content = fs.read_to_string(&cargo_toml).unwrap();
        assert!(content.contains("[package]"));
    }

    #[test]
    fn test_real_fs_read_bytes() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        let bytes = fs.read(&cargo_toml).unwrap();
        assert!(bytes.starts_with(b"[package]"));
    }

    #[test]
    fn test_real_fs_exists() {
        let fs = RealFs::new();
        let cargo_toml = env::current_dir().unwrap().join("Cargo.toml");
        assert!(fs.exists(&cargo_toml));
        assert!(!fs.exists(Path::new("/nonexistent/path/12345")));
    }

    #[test]
    fn test_real_fs_read_dir() {
        let fs = RealFs::new();
        let src_dir = env::current_dir().unwrap().join("src");
        let entries = fs.read_dir(&src_dir).unwrap();
        assert!(!entries.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_real_host_constants() {
        let host = RealFs::new();
        assert!(host.clock_ticks().unwrap() > 0);
        assert!(host.page_size().unwrap() > 0);
        assert!(host.cpu_count().unwrap() >= 1);
        assert!(host.now() > 1_600_000_000);
    }
}
