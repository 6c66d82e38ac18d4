//! Collectors for the Linux `/proc` filesystem.
//!
//! This module provides parsers and collectors for reading system and process
//! information from the `/proc` virtual filesystem, and the [`ProcfsBackend`]
//! that drives them.

mod backend;
pub mod parser;
pub mod process;
pub mod system;

pub use backend::ProcfsBackend;
pub use process::{CollectError, CycleClock, ProcessCollector};
pub use system::{MAX_SWAP_TABLE_ATTEMPTS, SystemCollector};
