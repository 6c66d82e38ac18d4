//! CPU rate computation from cumulative tick counters.
//!
//! The kernel only exposes ever-growing tick counts per category. Usage
//! percentages come from the difference between two consecutive samples,
//! so the engine keeps the previous counters as explicit state owned by one
//! backend instance.

use crate::model::{CpuTicks, CpuUsage};

/// The counters the rate engine keeps between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuCounters {
    /// user + nice.
    pub user: u64,
    pub system: u64,
    /// iowait.
    pub wait: u64,
    /// Sum of every category, including idle, irq and softirq.
    pub total: u64,
}

impl From<CpuTicks> for CpuCounters {
    fn from(ticks: CpuTicks) -> Self {
        Self {
            user: ticks.user.wrapping_add(ticks.nice),
            system: ticks.system,
            wait: ticks.iowait,
            total: ticks.total(),
        }
    }
}

/// Signed difference of two cumulative counters.
fn delta(curr: u64, prev: u64) -> f64 {
    (i128::from(curr) - i128::from(prev)) as f64
}

/// Turns consecutive CPU counter samples into usage percentages.
#[derive(Debug, Default)]
pub struct CpuRateEngine {
    prev: Option<CpuCounters>,
}

impl CpuRateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a new sample and returns usage since the previous one.
    ///
    /// Returns [`CpuUsage::unavailable`] on the first call and whenever the
    /// total did not advance (counter reset, overflow, or two samples within
    /// one tick). The new counters become the baseline in every case.
    pub fn update(&mut self, counters: CpuCounters) -> CpuUsage {
        let usage = match self.prev {
            Some(prev) => {
                let delta_total = delta(counters.total, prev.total);
                if delta_total > 0.0 {
                    CpuUsage {
                        user: 100.0 * delta(counters.user, prev.user) / delta_total,
                        system: 100.0 * delta(counters.system, prev.system) / delta_total,
                        wait: 100.0 * delta(counters.wait, prev.wait) / delta_total,
                    }
                } else {
                    CpuUsage::unavailable()
                }
            }
            None => CpuUsage::unavailable(),
        };
        self.prev = Some(counters);
        usage
    }

    /// Baseline stored by the last call to [`update`](Self::update).
    pub fn baseline(&self) -> Option<CpuCounters> {
        self.prev
    }

    /// Forgets the baseline; the next update reports "not yet available".
    pub fn reset(&mut self) {
        self.prev = None;
    }
}
