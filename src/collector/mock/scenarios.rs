//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for testing various system conditions.

use super::filesystem::MockFs;

/// Builds a `/proc/[pid]/stat` line with the fields the sampler reads.
#[allow(clippy::too_many_arguments)]
pub fn stat_line(
    pid: u32,
    comm: &str,
    state: char,
    ppid: u32,
    utime: u64,
    stime: u64,
    threads: u32,
    starttime: u64,
    rss_pages: u64,
) -> String {
    format!(
        "{pid} ({comm}) {state} {ppid} {pid} {pid} 0 -1 4194304 100 0 0 0 {utime} {stime} 0 0 20 0 {threads} 0 {starttime} 12345678 {rss_pages} 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0"
    )
}

/// Builds a `/proc/[pid]/status` block with name and credentials.
pub fn status_text(name: &str, pid: u32, ppid: u32, uid: u32, euid: u32, gid: u32) -> String {
    format!(
        "Name:\t{name}\nState:\tS (sleeping)\nPid:\t{pid}\nPPid:\t{ppid}\nUid:\t{uid}\t{euid}\t{euid}\t{euid}\nGid:\t{gid}\t{gid}\t{gid}\t{gid}\nThreads:\t1\n"
    )
}

/// Builds a `/proc/[pid]/io` block.
pub fn io_text(read_bytes: u64, write_bytes: u64) -> String {
    format!(
        "rchar: {}\nwchar: {}\nsyscr: 10\nsyscw: 5\nread_bytes: {read_bytes}\nwrite_bytes: {write_bytes}\ncancelled_write_bytes: 0\n",
        read_bytes * 2,
        write_bytes * 2
    )
}

const TYPICAL_MEMINFO: &str = "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        3072000 kB
Dirty:              1024 kB
Writeback:             0 kB
Slab:             512000 kB
SReclaimable:     256000 kB
";

const TYPICAL_STAT: &str = "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
";

const TYPICAL_SWAPS: &str = "\
Filename\t\t\t\tType\t\tSize\t\tUsed\t\tPriority
/dev/sda2                               partition\t4096000\t\t1024000\t\t-2
";

impl MockFs {
    /// Creates a typical system with a few processes.
    ///
    /// Includes: init (PID 1), a bash shell (1000) and a `sleep` child of
    /// the shell (1001). Wall clock is 12345 seconds after boot.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();
        fs.set_now(1_700_012_345);

        fs.add_file("/proc/self/io", io_text(0, 0));
        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file("/proc/meminfo", TYPICAL_MEMINFO);
        fs.add_file("/proc/stat", TYPICAL_STAT);
        fs.add_file("/proc/swaps", TYPICAL_SWAPS);

        fs.add_process(
            1,
            &stat_line(1, "systemd", 'S', 0, 500, 300, 1, 1, 3000),
            &status_text("systemd", 1, 0, 0, 0, 0),
            &io_text(4096, 8192),
            "/sbin/init\0splash\0",
        );
        fs.add_process(
            1000,
            &stat_line(1000, "bash", 'S', 1, 100, 50, 1, 100000, 1000),
            &status_text("bash", 1000, 1, 1000, 1000, 1000),
            &io_text(100000, 50000),
            "/bin/bash\0--login\0",
        );
        fs.add_process(
            1001,
            &stat_line(1001, "sleep", 'S', 1000, 0, 1, 1, 200000, 100),
            &status_text("sleep", 1001, 1000, 1000, 1000, 1000),
            &io_text(0, 0),
            "sleep\0infinity\0",
        );

        fs
    }

    /// Typical system plus a zombie child of bash (PID 4000).
    pub fn with_zombie_process() -> Self {
        let mut fs = Self::typical_system();
        fs.add_process(
            4000,
            &stat_line(4000, "defunct", 'Z', 1000, 3, 2, 1, 400000, 0),
            &status_text("defunct", 4000, 1000, 1000, 1000, 1000),
            "",
            "",
        );
        fs
    }

    /// Typical system plus processes whose names contain spaces and parentheses.
    pub fn with_special_names() -> Self {
        let mut fs = Self::typical_system();
        fs.add_process(
            5000,
            &stat_line(5000, "Web Content", 'S', 1000, 5000, 1000, 20, 500000, 50000),
            &status_text("Web Content", 5000, 1000, 1000, 1000, 1000),
            &io_text(1, 2),
            "/usr/lib/firefox/firefox\0-contentproc\0",
        );
        fs.add_process(
            5001,
            &stat_line(5001, "test(1)", 'R', 1, 10, 5, 1, 500100, 10),
            &status_text("test(1)", 5001, 1, 0, 0, 0),
            &io_text(0, 0),
            "",
        );
        fs
    }

    /// Typical system plus one process with a corrupt stat (PID 6000) and one
    /// whose status lacks the `Gid:` line (PID 6001).
    pub fn with_corrupt_processes() -> Self {
        let mut fs = Self::typical_system();
        fs.add_process(
            6000,
            "6000 (broken) S 1 6000 6000 0 -1 4194304 garbage",
            &status_text("broken", 6000, 1, 0, 0, 0),
            &io_text(0, 0),
            "broken\0",
        );
        fs.add_process(
            6001,
            &stat_line(6001, "nogid", 'S', 1, 1, 1, 1, 600000, 10),
            "Name:\tnogid\nUid:\t0\t0\t0\t0\n",
            &io_text(0, 0),
            "nogid\0",
        );
        fs
    }

    /// Typical system plus a process whose parent exited (ppid 7777 absent).
    pub fn with_orphan_process() -> Self {
        let mut fs = Self::typical_system();
        fs.add_process(
            7000,
            &stat_line(7000, "orphan", 'S', 7777, 1, 1, 1, 700000, 10),
            &status_text("orphan", 7000, 7777, 1000, 1000, 1000),
            &io_text(0, 0),
            "orphan\0",
        );
        fs
    }

    /// System under memory pressure: low free memory and swap in use.
    pub fn memory_pressure() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:          256000 kB
MemAvailable:     512000 kB
Buffers:           16000 kB
Cached:           200000 kB
SwapTotal:       4096000 kB
SwapFree:         512000 kB
Slab:             128000 kB
SReclaimable:      40000 kB
",
        );
        fs
    }

    /// Typical system without any swap configured.
    pub fn no_swap() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapTotal:             0 kB
SwapFree:              0 kB
SReclaimable:     256000 kB
",
        );
        fs.add_file("/proc/swaps", "Filename\t\t\t\tType\t\tSize\t\tUsed\t\tPriority\n");
        fs
    }

    /// Old kernel: no per-process I/O accounting, a four column `cpu` line
    /// and no `SReclaimable` in meminfo.
    pub fn old_kernel() -> Self {
        let mut fs = Self::typical_system();
        fs.remove_file("/proc/self/io");
        for pid in [1, 1000, 1001] {
            fs.remove_file(format!("/proc/{}/io", pid));
        }
        fs.add_file("/proc/stat", "cpu  1000 50 300 8000\nbtime 1700000000\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );
        fs
    }

    /// Typical system with a ZFS ARC holding 1 GiB.
    pub fn with_zfs_arc() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file(
            "/proc/spl/kstat/zfs/arcstats",
            "\
13 1 0x01 96 26112 1790795419 148238853296629
name                            type data
hits                            4    123456
size                            4    1073741824
",
        );
        fs
    }

    /// System with high CPU load.
    pub fn high_cpu_load() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file("/proc/loadavg", "4.50 3.20 2.10 8/200 5678\n");
        fs.add_file(
            "/proc/stat",
            "cpu  90000 5000 30000 10000 2000 500 300 0 0 0\nbtime 1700000000\n",
        );
        fs
    }
}
