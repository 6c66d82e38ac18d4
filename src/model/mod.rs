//! Data model shared by backends, the tree builder and consumers.
//!
//! - `process` - one [`ProcessRecord`] per sampled process
//! - `system` - static host info and per-cycle memory/CPU/swap samples

pub mod process;
pub mod system;

pub use process::{Credentials, ProcessRecord, ZOMBIE_STATE, is_zombie_state};
pub use system::{
    CpuSample, CpuTicks, CpuUsage, MemorySample, StaticInfo, SwapDevice, SystemSnapshot,
};
