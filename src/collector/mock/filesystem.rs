//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.
//! It also stands in for the host constants normally obtained from `sysconf`.

use crate::collector::traits::{FileSystem, HostEnv};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Host constants reported by a [`MockFs`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockHost {
    pub clock_ticks: Option<i64>,
    pub page_size: Option<i64>,
    pub cpu_count: Option<i64>,
    pub now: i64,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            clock_ticks: Some(100),
            page_size: Some(4096),
            cpu_count: Some(4),
            now: 1_700_012_345,
        }
    }
}

/// Read bookkeeping shared between clones of one `MockFs`.
#[derive(Debug, Default)]
struct ReadState {
    /// Contents returned by the next reads of a path, before the static file.
    queued: HashMap<PathBuf, VecDeque<Vec<u8>>>,
    /// Number of successful reads per path.
    reads: HashMap<PathBuf, usize>,
}

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// various `/proc` filesystem states without needing actual Linux access.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, Vec<u8>>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    host: MockHost,
    state: Arc<Mutex<ReadState>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Removes a file, simulating an interface that vanished.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Makes the next reads of `path` return `contents` in order.
    ///
    /// Once the queue is drained, reads see the file added with `add_file`.
    /// Used to simulate kernel tables changing between two reads.
    pub fn queue_reads<I, C>(&mut self, path: impl AsRef<Path>, contents: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        let mut state = self.lock_state();
        state
            .queued
            .entry(path)
            .or_default()
            .extend(contents.into_iter().map(Into::into));
    }

    /// Number of successful reads of `path` so far.
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        self.lock_state()
            .reads
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    /// Replaces the host constants this mock reports.
    pub fn set_host(&mut self, host: MockHost) {
        self.host = host;
    }

    /// Returns the host constants this mock reports.
    pub fn host(&self) -> MockHost {
        self.host
    }

    /// Moves the mock wall clock.
    pub fn set_now(&mut self, now: i64) {
        self.host.now = now;
    }

    /// Adds a process with all its typical `/proc/[pid]/` files.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `stat` - Content of `/proc/[pid]/stat`
    /// * `status` - Content of `/proc/[pid]/status`
    /// * `io` - Content of `/proc/[pid]/io` (can be empty if not accessible)
    /// * `cmdline` - Content of `/proc/[pid]/cmdline`
    pub fn add_process(&mut self, pid: u32, stat: &str, status: &str, io: &str, cmdline: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
        if !io.is_empty() {
            self.add_file(base.join("io"), io);
        }
        self.add_file(base.join("cmdline"), cmdline);
    }

    /// Loads a mock filesystem from a directory snapshot.
    ///
    /// This is useful for regression tests with real `/proc` snapshots.
    pub fn from_snapshot(dir: &Path) -> io::Result<Self> {
        let mut fs = Self::new();
        load_directory_recursive(&mut fs, dir, Path::new("/proc"))?;
        Ok(fs)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ReadState> {
        // A panicking test thread must not hide the counters from the others.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn load_directory_recursive(
    fs: &mut MockFs,
    real_path: &Path,
    virtual_path: &Path,
) -> io::Result<()> {
    fs.add_dir(virtual_path);

    for entry in std::fs::read_dir(real_path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        let real_child = entry.path();
        let virtual_child = virtual_path.join(&name);

        if file_type.is_dir() {
            load_directory_recursive(fs, &real_child, &virtual_child)?;
        } else if file_type.is_file() {
            fs.add_file(&virtual_child, std::fs::read(&real_child)?);
        }
    }
    Ok(())
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut state = self.lock_state();
        let queued = state.queued.get_mut(path).and_then(VecDeque::pop_front);
        let content = match queued {
            Some(content) => content,
            None => self.files.get(path).cloned().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("file not found: {:?}", path),
                )
            })?,
        };
        *state.reads.entry(path.to_path_buf()).or_default() += 1;
        Ok(content)
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}

impl HostEnv for MockFs {
    fn clock_ticks(&self) -> Option<i64> {
        self.host.clock_ticks
    }

    fn page_size(&self) -> Option<i64> {
        self.host.page_size
    }

    fn cpu_count(&self) -> Option<i64> {
        self.host.cpu_count
    }

    fn now(&self) -> i64 {
        self.host.now
    }
}
