//! procsample - Process and system sampling library.
//!
//! Each cycle produces a [`ProcessTree`](tree::ProcessTree) of every visible
//! process and a [`SystemSnapshot`](model::SystemSnapshot) with host-wide
//! memory, swap, CPU and load figures. It is used by:
//! - `procsampled` - periodic sampler emitting one JSON document per cycle
//! - anything that evaluates thresholds against sampled values

pub mod collector;
pub mod config;
pub mod model;
pub mod rates;
pub mod sampler;
pub mod tree;

pub use config::SamplerConfig;
pub use sampler::{Cycle, CycleTiming, SampleFailure, SamplePhase, Sampler};
pub use tree::ProcessTree;
