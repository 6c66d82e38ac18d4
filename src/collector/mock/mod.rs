//! Mock implementations for testing collectors without a real `/proc`.

mod filesystem;
mod scenarios;

pub use filesystem::{MockFs, MockHost};
pub use scenarios::{io_text, stat_line, status_text};
