//! Errors surfaced by sampling backends.
//!
//! Only the variants of [`SampleError`] ever reach the caller. Per-process
//! problems ([`CollectError`](crate::collector::procfs::CollectError)) and
//! missing optional counters are absorbed inside the backend with a log line.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for sampling calls.
#[derive(Debug, Error)]
pub enum SampleError {
    /// A required static host constant could not be obtained.
    ///
    /// The sampler cannot be used after this.
    #[error("sampler initialization failed: {0}")]
    FatalInit(String),

    /// A sampling call was made before a successful `init()`.
    #[error("sampler is not initialized")]
    NotInitialized,

    /// A required system-wide counter is absent or unparsable.
    #[error("required field {field} missing from {interface}")]
    RequiredFieldMissing {
        interface: &'static str,
        field: &'static str,
    },

    /// A kernel interface could not be read at all.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SampleError {
    pub(crate) fn missing(interface: &'static str, field: &'static str) -> Self {
        SampleError::RequiredFieldMissing { interface, field }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SampleError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors after which the sampler must not be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SampleError::FatalInit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_required_field_missing() {
        let err = SampleError::missing("meminfo", "SwapFree");
        assert_eq!(err.to_string(), "required field SwapFree missing from meminfo");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_init_is_fatal() {
        let err = SampleError::FatalInit("cannot get page size".into());
        assert!(err.is_fatal());
        assert!(err.to_string().contains("page size"));
    }
}
