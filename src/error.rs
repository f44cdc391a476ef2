//! Error types for mirrorwatch
//!
//! Uses `thiserror` for library errors. Fatal variants map onto the process
//! exit codes documented in the CLI help; the rest are recovered locally and
//! only ever logged.

use std::path::PathBuf;
use thiserror::Error;

use crate::mirror::MirrorStatus;

/// Result type alias for mirrorwatch operations
pub type MirrorwatchResult<T> = Result<T, MirrorwatchError>;

/// Main error type for mirrorwatch operations
#[derive(Error, Debug)]
pub enum MirrorwatchError {
    /// Source argument is missing or not a directory
    #[error("source '{path}' is not a directory")]
    SourceNotDirectory { path: PathBuf },

    /// Invalid invocation
    #[error("{message}")]
    Usage { message: String },

    /// Config file could not be parsed
    #[error("invalid config in {file}: {message}")]
    Config { file: PathBuf, message: String },

    /// The initial full mirror (or the confirmed delete) did not succeed
    #[error("initial sync failed: {reason}")]
    InitialSync { reason: String },

    /// A mirror invocation during an incremental pass did not succeed
    #[error("transfer failed: rsync {status}")]
    Transfer { status: MirrorStatus },

    /// The change-notification source went away
    #[error("change notification source terminated")]
    ProducerTerminated,

    /// The change-notification source could not be started
    #[error("failed to watch source: {message}")]
    Watcher { message: String },

    /// A change-notification line that could not be framed
    #[error("malformed change event '{line}': {reason}")]
    MalformedEvent { line: String, reason: String },

    /// A path that cannot be written to the line-oriented ledger
    #[error("path {path:?} cannot be represented in the change ledger")]
    UnrepresentablePath { path: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorwatchError {
    /// Process exit status for errors that end the daemon.
    pub fn exit_code(&self) -> i32 {
        match self {
            MirrorwatchError::SourceNotDirectory { .. }
            | MirrorwatchError::Usage { .. }
            | MirrorwatchError::Config { .. } => 1,
            MirrorwatchError::InitialSync { .. } => 2,
            MirrorwatchError::ProducerTerminated | MirrorwatchError::Watcher { .. } => 3,
            _ => 1,
        }
    }
}
