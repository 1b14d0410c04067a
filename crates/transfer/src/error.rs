//! Transfer-level error taxonomy.
//!
//! A handful of classes cover everything that can go wrong mid-run: the wire
//! broke or went quiet, the peer misbehaved, a reconstructed file failed
//! verification, or the local filesystem refused an operation. All of them
//! abort the transfer; the distinction exists for exit codes and diagnostics,
//! not for recovery.

use std::io;
use std::path::{Path, PathBuf};

/// Result alias used throughout the transfer crate.
pub type Result<T> = std::result::Result<T, TransferError>;

/// A fatal transfer failure.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The connection to the peer failed or ended prematurely.
    #[error("transport failure: {0}")]
    Transport(#[source] io::Error),

    /// No traffic arrived from the peer within the configured window.
    #[error("connection to peer timed out")]
    Timeout,

    /// The peer sent something the protocol does not allow.
    #[error("protocol violation: {detail}")]
    Protocol {
        /// Human-readable description of the violation.
        detail: String,
    },

    /// A reconstructed file's whole-file digest disagreed with the sender's.
    #[error("checksum mismatch reconstructing {}", path.display())]
    Integrity {
        /// Destination path of the file that failed verification.
        path: PathBuf,
    },

    /// A local filesystem operation failed.
    #[error("local I/O failure on {}: {source}", path.display())]
    LocalIo {
        /// Path the failing operation was touching.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// Classifies an I/O error raised while talking to the peer.
    ///
    /// Decode failures surface from the codecs as `InvalidData` and become
    /// protocol violations; timeouts keep their own class; everything else
    /// is a transport fault.
    #[must_use]
    pub fn transport(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::InvalidData => Self::Protocol {
                detail: error.to_string(),
            },
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            _ => Self::Transport(error),
        }
    }

    /// Wraps an I/O error raised by a local filesystem operation.
    #[must_use]
    pub fn local_io(path: &Path, source: io::Error) -> Self {
        Self::LocalIo {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Builds a protocol-violation error from a rendered detail string.
    #[must_use]
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::Protocol {
            detail: detail.into(),
        }
    }

    /// The rsync-compatible exit code for this failure class.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Protocol { .. } => 2,
            Self::LocalIo { .. } => 11,
            Self::Transport(_) => 12,
            Self::Integrity { .. } => 23,
            Self::Timeout => 30,
        }
    }
}
