//! Error taxonomy surfaced by the port lifecycle and streams.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::watch::WatchError;

/// Errors returned by [`crate::Port`] operations and surfaced by the
/// value streams.
#[derive(Debug, Error)]
pub enum GpioError {
    /// An operation other than claim/release was attempted while the
    /// line directory is absent.
    #[error("gpio line {line} is not enabled")]
    NotEnabled {
        /// Line index the operation targeted.
        line: u32,
    },

    /// A claim, release, or readiness wait exceeded its deadline.
    #[error("timed out after {timeout_ms} ms waiting on {path:?}")]
    Timeout {
        /// Path whose condition was still unmet at the deadline.
        path: PathBuf,
        /// Deadline that was exhausted, in milliseconds.
        timeout_ms: u64,
    },

    /// A direction file held a token outside the mode vocabulary.
    #[error("unrecognised direction token '{token}' in {path:?}")]
    InvalidMode {
        /// Token read from the direction file.
        token: String,
        /// Direction file that held the token.
        path: PathBuf,
    },

    /// Reading a control file failed.
    #[error("failed to read control file {path:?}: {source}")]
    Read {
        /// Control file that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Writing a control file failed.
    #[error("failed to write control file {path:?}: {source}")]
    Write {
        /// Control file that could not be written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A file watch poller stopped without delivering a verdict. Only
    /// reachable if the poller thread panicked.
    #[error("file watch on {path:?} resolved without a verdict")]
    WatchAbandoned {
        /// Path the watch was observing.
        path: PathBuf,
    },
}

impl From<WatchError> for GpioError {
    fn from(error: WatchError) -> Self {
        match error {
            WatchError::Timeout { path, timeout_ms } => Self::Timeout { path, timeout_ms },
            WatchError::Abandoned { path } => Self::WatchAbandoned { path },
        }
    }
}
