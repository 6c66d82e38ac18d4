//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::{CpuTicks, Credentials, SwapDevice};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

/// Parsed data from `/proc/[pid]/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub num_threads: i64,
    pub starttime: u64,
    pub rss: i64,
}

// Positions after the closing ')' of the comm field.
const STAT_STATE: usize = 0;
const STAT_PPID: usize = 1;
const STAT_UTIME: usize = 11;
const STAT_STIME: usize = 12;
const STAT_CUTIME: usize = 13;
const STAT_CSTIME: usize = 14;
const STAT_NUM_THREADS: usize = 17;
const STAT_STARTTIME: usize = 19;
const STAT_RSS: usize = 21;

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
///
/// The rightmost ')' ends the name; everything after it is positional.
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let comm = content[open_paren + 1..close_paren].to_string();
    if comm.is_empty() {
        return Err(ParseError::new("empty process name in stat"));
    }

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() <= STAT_RSS {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected {}+, got {}",
            STAT_RSS + 1,
            fields.len()
        )));
    }

    let field = |idx: usize, name: &str| -> Result<i64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };
    let field_u64 = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    let mut state_chars = fields[STAT_STATE].chars();
    let state = match (state_chars.next(), state_chars.next()) {
        (Some(c), None) => c,
        _ => return Err(ParseError::new("invalid state")),
    };

    Ok(ProcStat {
        pid,
        comm,
        state,
        ppid: u32::try_from(field(STAT_PPID, "ppid")?)
            .map_err(|_| ParseError::new("negative ppid"))?,
        utime: field_u64(STAT_UTIME, "utime")?,
        stime: field_u64(STAT_STIME, "stime")?,
        cutime: field(STAT_CUTIME, "cutime")?,
        cstime: field(STAT_CSTIME, "cstime")?,
        num_threads: field(STAT_NUM_THREADS, "num_threads")?,
        starttime: field_u64(STAT_STARTTIME, "starttime")?,
        rss: field(STAT_RSS, "rss")?,
    })
}

/// Parses the credential lines of `/proc/[pid]/status`.
///
/// `Uid:` must carry real and effective ids, `Gid:` at least the real id.
/// Either line missing or malformed fails the whole block.
pub fn parse_status_credentials(content: &str) -> Result<Credentials, ParseError> {
    let ids = |key: &str, want: usize| -> Result<Vec<u32>, ParseError> {
        let line = content
            .lines()
            .find_map(|line| line.strip_prefix(key))
            .ok_or_else(|| ParseError::new(format!("missing {}", key)))?;
        let ids: Vec<u32> = line
            .split_whitespace()
            .take(want)
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| ParseError::new(format!("invalid {}", key)))?;
        if ids.len() < want {
            return Err(ParseError::new(format!("truncated {}", key)));
        }
        Ok(ids)
    };

    let uids = ids("Uid:", 2)?;
    let gids = ids("Gid:", 1)?;

    Ok(Credentials {
        uid: uids[0],
        euid: uids[1],
        gid: gids[0],
    })
}

/// Parsed data from `/proc/[pid]/io`.
///
/// A field is `None` if its key is absent or its value does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcIo {
    pub read_bytes: Option<u64>,
    pub write_bytes: Option<u64>,
}

/// Parses `/proc/[pid]/io` content.
///
/// Format is key: value pairs, one per line.
pub fn parse_proc_io(content: &str) -> ProcIo {
    let mut io = ProcIo::default();
    let mut seen = HashSet::new();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if !seen.insert(key) {
            continue;
        }
        let value = value.trim().parse().ok();
        match key {
            "read_bytes" => io.read_bytes = value,
            "write_bytes" => io.write_bytes = value,
            _ => {}
        }
    }

    io
}

/// Joins a `/proc/[pid]/cmdline` buffer into a space separated string.
///
/// Arguments are NUL separated (and usually NUL terminated). An empty buffer,
/// as kernel threads and zombies have, yields `fallback`.
pub fn parse_cmdline(buf: &[u8], fallback: &str) -> String {
    let end = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    if end == 0 {
        return fallback.to_string();
    }
    let joined: Vec<u8> = buf[..end]
        .iter()
        .map(|&b| if b == 0 { b' ' } else { b })
        .collect();
    String::from_utf8_lossy(&joined).into_owned()
}

/// Parsed data from `/proc/meminfo`, in kilobytes.
///
/// A field is `None` when the key is absent or its first occurrence did not
/// parse; callers decide whether that is fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemInfo {
    pub mem_total: Option<u64>,
    pub mem_free: Option<u64>,
    pub buffers: Option<u64>,
    pub cached: Option<u64>,
    pub s_reclaimable: Option<u64>,
    pub swap_total: Option<u64>,
    pub swap_free: Option<u64>,
}

/// Parses `/proc/meminfo` content.
///
/// Each line is matched against the known keys; the first occurrence of a key
/// wins, even if its value turns out to be unparsable.
pub fn parse_meminfo(content: &str) -> MemInfo {
    let mut info = MemInfo::default();
    let mut seen = HashSet::new();

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut info.mem_total,
            "MemFree" => &mut info.mem_free,
            "Buffers" => &mut info.buffers,
            "Cached" => &mut info.cached,
            "SReclaimable" => &mut info.s_reclaimable,
            "SwapTotal" => &mut info.swap_total,
            "SwapFree" => &mut info.swap_free,
            _ => continue,
        };
        if !seen.insert(key.trim()) {
            continue;
        }
        *slot = rest.split_whitespace().next().and_then(|v| v.parse().ok());
    }

    info
}

/// Extracts the ARC size in bytes from `/proc/spl/kstat/zfs/arcstats`.
///
/// Format: `name type data`, e.g. `size 4 1073741824`.
pub fn parse_arcstats_size(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? != "size" {
            return None;
        }
        parts.next()?;
        parts.next()?.parse().ok()
    })
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// At least user, nice, system and idle must be present. Older kernels omit
/// iowait, irq and softirq; those read as 0.
pub fn parse_cpu_ticks(content: &str) -> Result<CpuTicks, ParseError> {
    let line = content
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| ParseError::new("missing aggregate cpu line"))?;

    let mut values = Vec::with_capacity(7);
    for token in line.split_whitespace().skip(1).take(7) {
        match token.parse::<u64>() {
            Ok(v) => values.push(v),
            Err(_) => break,
        }
    }

    if values.len() < 4 {
        return Err(ParseError::new(format!(
            "cpu line has {} counters, expected at least 4",
            values.len()
        )));
    }

    let get = |idx: usize| values.get(idx).copied().unwrap_or(0);
    Ok(CpuTicks {
        user: get(0),
        nice: get(1),
        system: get(2),
        idle: get(3),
        iowait: get(4),
        irq: get(5),
        softirq: get(6),
    })
}

/// Extracts boot time (`btime`) from `/proc/stat`.
pub fn parse_btime(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        line.strip_prefix("btime ")
            .and_then(|rest| rest.trim().parse().ok())
    })
}

/// Parses `/proc/uptime` and returns seconds since boot.
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?
        .parse()
        .map_err(|_| ParseError::new("invalid uptime"))
}

/// Parses `/proc/loadavg` and returns the 1, 5 and 15 minute averages.
pub fn parse_loadavg(content: &str) -> Result<[f64; 3], ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let mut load = [0.0; 3];
    for (slot, (value, name)) in load
        .iter_mut()
        .zip(parts.iter().zip(["load1", "load5", "load15"]))
    {
        *slot = value
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))?;
    }
    Ok(load)
}

/// Counts device entries in `/proc/swaps` without decoding them.
pub fn count_swap_entries(content: &str) -> usize {
    swap_lines(content).count()
}

/// Parses `/proc/swaps`.
///
/// Format:
/// Filename        Type        Size    Used    Priority
/// /dev/sda2       partition   8388604 1024    -2
///
/// Sizes are in kilobytes and converted to bytes.
pub fn parse_swaps(content: &str) -> Result<Vec<SwapDevice>, ParseError> {
    swap_lines(content)
        .map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return Err(ParseError::new(format!("short swaps line: {}", line)));
            }
            let kb = |idx: usize, name: &str| -> Result<u64, ParseError> {
                parts[idx]
                    .parse::<u64>()
                    .map(|v| v.saturating_mul(1024))
                    .map_err(|_| ParseError::new(format!("invalid swap {}", name)))
            };
            Ok(SwapDevice {
                path: parts[0].to_string(),
                kind: parts[1].to_string(),
                size_bytes: kb(2, "size")?,
                used_bytes: kb(3, "used")?,
                priority: parts[4]
                    .parse()
                    .map_err(|_| ParseError::new("invalid swap priority"))?,
            })
        })
        .collect()
}

fn swap_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with("Filename"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proc_stat_basic() {
        let content = "1234 (bash) S 1233 1234 1234 34816 1235 4194304 5000 50000 10 20 100 50 200 100 20 0 1 0 100000 25000000 2000 18446744073709551615 0 0 0 0 0 0 65536 3670020 1266777851 0 0 0 17 2 0 0 5 0 0 0 0 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.pid, 1234);
        assert_eq!(stat.comm, "bash");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1233);
        assert_eq!(stat.utime, 100);
        assert_eq!(stat.stime, 50);
        assert_eq!(stat.cutime, 200);
        assert_eq!(stat.cstime, 100);
        assert_eq!(stat.num_threads, 1);
        assert_eq!(stat.starttime, 100000);
        assert_eq!(stat.rss, 2000);
    }

    #[test]
    fn test_parse_proc_stat_with_spaces_in_comm() {
        let content = "5000 (Web Content) S 4999 5000 4999 0 -1 4194304 100000 0 500 0 5000 1000 0 0 20 0 20 0 500000 2000000000 50000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.pid, 5000);
        assert_eq!(stat.comm, "Web Content");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 4999);
        assert_eq!(stat.num_threads, 20);
    }

    #[test]
    fn test_parse_proc_stat_uses_rightmost_paren() {
        let content = "5001 (evil) R 1 (x) S 1 5001 5001 0 -1 4194304 1000 0 0 0 10 5 0 0 20 0 3 0 500100 10000000 1000 18446744073709551615 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.comm, "evil) R 1 (x");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 1);
        assert_eq!(stat.num_threads, 3);
    }

    #[test]
    fn test_parse_proc_stat_with_parentheses_in_comm() {
        let content = "5001 (test(1)) S 1 5001 5001 0 -1 4194304 1000 0 0 0 10 5 0 0 20 0 1 0 500100 10000000 1000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.pid, 5001);
        assert_eq!(stat.comm, "test(1)");
    }

    #[test]
    fn test_parse_proc_stat_zombie() {
        let content = "4000 (defunct) Z 1000 4000 1000 0 -1 4194308 0 0 0 0 0 0 0 0 20 0 1 0 400000 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 -1 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        let stat = parse_proc_stat(content).unwrap();

        assert_eq!(stat.pid, 4000);
        assert_eq!(stat.state, 'Z');
        assert_eq!(stat.rss, 0);
    }

    #[test]
    fn test_parse_proc_stat_truncated() {
        let err = parse_proc_stat("42 (short) S 1 42 42 0").unwrap_err();
        assert!(err.message.contains("not enough fields"));
    }

    #[test]
    fn test_parse_proc_stat_garbage_field() {
        let content = "1234 (bash) S 1233 1234 1234 34816 1235 4194304 5000 50000 10 20 abc 50 200 100 20 0 1 0 100000 25000000 2000";
        let err = parse_proc_stat(content).unwrap_err();
        assert_eq!(err.message, "invalid utime");
    }

    #[test]
    fn test_parse_proc_stat_missing_parens() {
        assert!(parse_proc_stat("1234 bash S 1").is_err());
        assert!(parse_proc_stat("1234 )bash( S 1").is_err());
        assert!(parse_proc_stat("").is_err());
    }

    #[test]
    fn test_parse_status_credentials() {
        let content = "\
Name:\tbash
Pid:\t1234
PPid:\t1233
Uid:\t1000\t0\t1000\t1000
Gid:\t100\t100\t100\t100
VmRSS:\t    8000 kB
";
        let creds = parse_status_credentials(content).unwrap();

        assert_eq!(creds.uid, 1000);
        assert_eq!(creds.euid, 0);
        assert_eq!(creds.gid, 100);
    }

    #[test]
    fn test_parse_status_credentials_requires_both_lines() {
        let no_gid = "Name:\tbash\nUid:\t1000\t1000\t1000\t1000\n";
        assert!(parse_status_credentials(no_gid).is_err());

        let no_uid = "Name:\tbash\nGid:\t1000\t1000\t1000\t1000\n";
        assert!(parse_status_credentials(no_uid).is_err());

        let short_uid = "Uid:\t1000\nGid:\t1000\n";
        assert!(parse_status_credentials(short_uid).is_err());

        let bad_gid = "Uid:\t1000\t1000\nGid:\tx\n";
        assert!(parse_status_credentials(bad_gid).is_err());
    }

    #[test]
    fn test_parse_proc_io() {
        let content = "\
rchar: 1000000
wchar: 500000
syscr: 5000
syscw: 2500
read_bytes: 100000
write_bytes: 50000
cancelled_write_bytes: 1000
";
        let io = parse_proc_io(content);

        assert_eq!(io.read_bytes, Some(100000));
        assert_eq!(io.write_bytes, Some(50000));
    }

    #[test]
    fn test_parse_proc_io_missing_keys() {
        let io = parse_proc_io("rchar: 10\nwrite_bytes: oops\n");
        assert_eq!(io.read_bytes, None);
        assert_eq!(io.write_bytes, None);
    }

    #[test]
    fn test_parse_cmdline() {
        assert_eq!(
            parse_cmdline(b"/bin/bash\0--login\0", "bash"),
            "/bin/bash --login"
        );
        assert_eq!(parse_cmdline(b"nginx: worker", "nginx"), "nginx: worker");
        assert_eq!(parse_cmdline(b"a\0\0b\0", "x"), "a  b");
    }

    #[test]
    fn test_parse_cmdline_empty_falls_back_to_name() {
        assert_eq!(parse_cmdline(b"", "kthreadd"), "kthreadd");
        assert_eq!(parse_cmdline(b"\0", "kthreadd"), "kthreadd");
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
Slab:             512000 kB
SReclaimable:     256000 kB
";
        let info = parse_meminfo(content);

        assert_eq!(info.mem_total, Some(16384000));
        assert_eq!(info.mem_free, Some(8192000));
        assert_eq!(info.buffers, Some(512000));
        assert_eq!(info.cached, Some(2048000));
        assert_eq!(info.s_reclaimable, Some(256000));
        assert_eq!(info.swap_total, Some(4096000));
        assert_eq!(info.swap_free, Some(4096000));
    }

    #[test]
    fn test_parse_meminfo_first_match_wins() {
        let content = "MemFree: bogus kB\nMemFree: 100 kB\nBuffers: 5 kB\nBuffers: 7 kB\n";
        let info = parse_meminfo(content);

        assert_eq!(info.mem_free, None);
        assert_eq!(info.buffers, Some(5));
        assert_eq!(info.cached, None);
    }

    #[test]
    fn test_parse_meminfo_does_not_confuse_swap_cached() {
        let info = parse_meminfo("SwapCached: 999 kB\nCached: 10 kB\n");
        assert_eq!(info.cached, Some(10));
    }

    #[test]
    fn test_parse_arcstats_size() {
        let content = "\
13 1 0x01 96 26112 1790795419 148238853296629
name                            type data
hits                            4    123456
size                            4    1073741824
c_max                           4    4294967296
";
        assert_eq!(parse_arcstats_size(content), Some(1073741824));
        assert_eq!(parse_arcstats_size("hits 4 1\n"), None);
    }

    #[test]
    fn test_parse_cpu_ticks() {
        let content = "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
ctxt 500000
btime 1700000000
";
        let ticks = parse_cpu_ticks(content).unwrap();

        assert_eq!(ticks.user, 10000);
        assert_eq!(ticks.nice, 500);
        assert_eq!(ticks.system, 3000);
        assert_eq!(ticks.idle, 80000);
        assert_eq!(ticks.iowait, 1000);
        assert_eq!(ticks.irq, 200);
        assert_eq!(ticks.softirq, 100);
    }

    #[test]
    fn test_parse_cpu_ticks_old_kernel() {
        let ticks = parse_cpu_ticks("cpu 100 20 30 400\n").unwrap();
        assert_eq!(ticks.iowait, 0);
        assert_eq!(ticks.irq, 0);
        assert_eq!(ticks.softirq, 0);
        assert_eq!(ticks.total(), 550);
    }

    #[test]
    fn test_parse_cpu_ticks_too_few_counters() {
        assert!(parse_cpu_ticks("cpu 100 20 30\n").is_err());
        assert!(parse_cpu_ticks("cpu0 1 2 3 4 5\n").is_err());
    }

    #[test]
    fn test_parse_btime_and_uptime() {
        assert_eq!(
            parse_btime("cpu 1 2 3 4\nbtime 1700000000\n"),
            Some(1700000000)
        );
        assert_eq!(parse_btime("cpu 1 2 3 4\n"), None);
        assert!((parse_uptime("12345.67 98765.43\n").unwrap() - 12345.67).abs() < 1e-9);
        assert!(parse_uptime("").is_err());
    }

    #[test]
    fn test_parse_loadavg() {
        let load = parse_loadavg("0.15 0.10 0.05 1/150 1234\n").unwrap();

        assert!((load[0] - 0.15).abs() < 0.001);
        assert!((load[1] - 0.10).abs() < 0.001);
        assert!((load[2] - 0.05).abs() < 0.001);
        assert!(parse_loadavg("0.15 0.10").is_err());
        assert!(parse_loadavg("0.15 x 0.05").is_err());
    }

    #[test]
    fn test_parse_swaps() {
        let content = "\
Filename\t\t\t\tType\t\tSize\t\tUsed\t\tPriority
/dev/sda2                               partition\t8388604\t\t1024\t\t-2
/swapfile                               file\t\t1048572\t\t0\t\t-3
";
        assert_eq!(count_swap_entries(content), 2);
        let devices = parse_swaps(content).unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].path, "/dev/sda2");
        assert_eq!(devices[0].kind, "partition");
        assert_eq!(devices[0].size_bytes, 8388604 * 1024);
        assert_eq!(devices[0].used_bytes, 1024 * 1024);
        assert_eq!(devices[0].priority, -2);
        assert_eq!(devices[1].kind, "file");
    }

    #[test]
    fn test_parse_swaps_header_only() {
        let content = "Filename\t\t\t\tType\t\tSize\t\tUsed\t\tPriority\n";
        assert_eq!(count_swap_entries(content), 0);
        assert!(parse_swaps(content).unwrap().is_empty());
    }

    #[test]
    fn test_parse_swaps_oversized_size_saturates() {
        let content = "\
Filename\t\t\t\tType\t\tSize\t\tUsed\t\tPriority
/dev/sdb1 partition 18014398509481985 0 -2
";
        let devices = parse_swaps(content).unwrap();

        assert_eq!(devices[0].size_bytes, u64::MAX);
        assert_eq!(devices[0].used_bytes, 0);
    }
}
