//! Sampler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between two cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Knobs for a [`Sampler`](crate::sampler::Sampler).
///
/// Host constants (page size, clock rate, CPU count) are not configurable;
/// they are read from the host during init.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Root of the proc filesystem.
    pub proc_path: String,
    /// Read each process's command line.
    pub collect_command_line: bool,
    /// Pause between cycles when run periodically.
    pub interval: Duration,
    /// Read the swap device table when swap is configured.
    pub swap_devices: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            proc_path: "/proc".to_string(),
            collect_command_line: false,
            interval: DEFAULT_INTERVAL,
            swap_devices: true,
        }
    }
}

impl SamplerConfig {
    pub fn with_proc_path(mut self, proc_path: impl Into<String>) -> Self {
        self.proc_path = proc_path.into();
        self
    }

    pub fn with_command_line(mut self, enabled: bool) -> Self {
        self.collect_command_line = enabled;
        self
    }

    /// Sets the interval; zero is raised to one second.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn with_swap_devices(mut self, enabled: bool) -> Self {
        self.swap_devices = enabled;
        self
    }
}
