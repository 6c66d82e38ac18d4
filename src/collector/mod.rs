//! Process and system samplers.
//!
//! This module reads processes and host-wide counters from kernel interfaces,
//! with support for mocking so the whole pipeline runs without Linux.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ProcfsBackend (Backend)                   │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  ProcessCollector   │   │     SystemCollector         │  │
//! │  │  - /proc/[pid]/*    │   │  - /proc/meminfo            │  │
//! │  │                     │   │  - /proc/stat, uptime       │  │
//! │  └──────────┬──────────┘   │  - /proc/loadavg, swaps     │  │
//! │             │              └──────────────┬──────────────┘  │
//! │             │   CpuRateEngine             │                 │
//! │             └──────────────┬──────────────┘                 │
//! │                            │                                │
//! │                ┌───────────▼───────────┐                    │
//! │                │ FileSystem + HostEnv  │ (traits)           │
//! │                └───────────┬───────────┘                    │
//! └────────────────────────────┼────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              │               │               │
//!       ┌──────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use procsample::collector::{Backend, ProcfsBackend, RealFs};
//!
//! let mut backend = ProcfsBackend::new(RealFs::new(), "/proc");
//! backend.init()?;
//! let processes = backend.sample_processes(false)?;
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use procsample::collector::{Backend, MockFs, ProcfsBackend};
//!
//! let mut backend = ProcfsBackend::new(MockFs::typical_system(), "/proc");
//! backend.init().unwrap();
//! let processes = backend.sample_processes(false).unwrap();
//! assert_eq!(processes.len(), 3);
//! ```

mod error;
pub mod mock;
pub mod procfs;
pub mod retry;
pub mod traits;

pub use error::SampleError;
pub use mock::{MockFs, MockHost};
pub use procfs::{CollectError, ProcfsBackend};
pub use traits::{Backend, FileSystem, HostEnv, RealFs};
