//! One full sampling cycle over any [`Backend`].
//!
//! A cycle enumerates processes, then samples memory, CPU, load average and
//! (when swap is configured) the swap device table. Sampling failures do not
//! abort the cycle: the affected fields stay zeroed (or the tree stays empty)
//! and the failure is listed in [`Cycle::failures`].

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::collector::{Backend, SampleError};
use crate::config::SamplerConfig;
use crate::model::{CpuUsage, StaticInfo, SystemSnapshot};
use crate::tree::ProcessTree;

/// Timing information for one cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleTiming {
    /// Total cycle time.
    pub total: Duration,
    /// Time to enumerate processes and build the tree.
    pub processes: Duration,
    /// Time to sample memory and swap.
    pub memory: Duration,
    /// Time to sample CPU counters.
    pub cpu: Duration,
    /// Time to read the load average.
    pub loadavg: Duration,
    /// Time to read the swap device table (zero when skipped).
    pub swap_devices: Duration,
}

/// Sampling call that failed within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplePhase {
    Processes,
    Memory,
    Cpu,
    LoadAverage,
    SwapDevices,
}

/// A failed system-wide sample; its fields in the snapshot are zero.
#[derive(Debug, Clone, Serialize)]
pub struct SampleFailure {
    pub phase: SamplePhase,
    pub message: String,
}

/// Output of one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    /// Seconds since the epoch when the cycle started, from the backend clock.
    pub timestamp: i64,
    pub tree: ProcessTree,
    pub system: SystemSnapshot,
    pub failures: Vec<SampleFailure>,
    pub timing: CycleTiming,
}

impl Cycle {
    /// Whether `phase` failed during this cycle.
    pub fn failed(&self, phase: SamplePhase) -> bool {
        self.failures.iter().any(|f| f.phase == phase)
    }
}

/// Drives a backend through init and periodic cycles.
///
/// The backend is chosen at build time through the type parameter. A sampler
/// owns its backend, so one in-flight cycle per sampler is enforced by `&mut`.
pub struct Sampler<B: Backend> {
    backend: B,
    config: SamplerConfig,
}

impl<B: Backend> Sampler<B> {
    pub fn new(backend: B, config: SamplerConfig) -> Self {
        Self { backend, config }
    }

    /// Reads static host values. A failure here is fatal for this sampler.
    pub fn init(&mut self) -> Result<&StaticInfo, SampleError> {
        self.backend.init()
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Runs one full cycle.
    ///
    /// Fails only when the sampler is not initialized; an unlistable process
    /// directory yields an empty tree and a `Processes` failure.
    pub fn run_cycle(&mut self) -> Result<Cycle, SampleError> {
        let info = self
            .backend
            .static_info()
            .cloned()
            .ok_or(SampleError::NotInitialized)?;

        let total_start = Instant::now();
        let timestamp = self.backend.now();
        let mut timing = CycleTiming::default();
        let mut failures = Vec::new();

        let start = Instant::now();
        let tree = match self
            .backend
            .sample_processes(self.config.collect_command_line)
        {
            Ok(processes) => ProcessTree::build(processes),
            Err(e) => {
                record(&mut failures, SamplePhase::Processes, e);
                ProcessTree::default()
            }
        };
        timing.processes = start.elapsed();

        let mut system = SystemSnapshot::from_static(&info);

        let start = Instant::now();
        match self.backend.sample_system_memory() {
            Ok(memory) => system.apply_memory(&memory),
            Err(e) => record(&mut failures, SamplePhase::Memory, e),
        }
        timing.memory = start.elapsed();

        let start = Instant::now();
        match self.backend.sample_system_cpu() {
            Ok(cpu) => system.apply_cpu(&cpu.usage),
            Err(e) => {
                system.apply_cpu(&CpuUsage::zeroed());
                record(&mut failures, SamplePhase::Cpu, e);
            }
        }
        timing.cpu = start.elapsed();

        let start = Instant::now();
        match self.backend.load_average(3) {
            Ok(load) => {
                for (slot, value) in system.load_average.iter_mut().zip(load) {
                    *slot = value;
                }
            }
            Err(e) => record(&mut failures, SamplePhase::LoadAverage, e),
        }
        timing.loadavg = start.elapsed();

        if self.config.swap_devices && system.swap_total_bytes > 0 {
            let start = Instant::now();
            match self.backend.sample_swap_devices() {
                Ok(devices) => system.swap_devices = devices,
                Err(e) => record(&mut failures, SamplePhase::SwapDevices, e),
            }
            timing.swap_devices = start.elapsed();
        }

        timing.total = total_start.elapsed();
        debug!(
            processes = tree.len(),
            failures = failures.len(),
            total_ms = timing.total.as_millis() as u64,
            "cycle complete"
        );

        Ok(Cycle {
            timestamp,
            tree,
            system,
            failures,
            timing,
        })
    }
}

fn record(failures: &mut Vec<SampleFailure>, phase: SamplePhase, error: SampleError) {
    warn!(?phase, error = %error, "sample failed, reporting zeros");
    failures.push(SampleFailure {
        phase,
        message: error.to_string(),
    });
}
