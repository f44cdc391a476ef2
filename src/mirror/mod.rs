//! Mirror operations
//!
//! Defines the interface the sync engine needs from the bulk transfer tool.
//! The production implementation shells out to rsync ([`RsyncMirror`]).

mod rsync;

pub use rsync::{RsyncMirror, RSYNC_VANISHED};

use std::fmt;

use crate::cancel::CancelToken;
use crate::error::MirrorwatchResult;

/// How a mirror invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStatus {
    /// Process exited with this code
    Exited(i32),
    /// Process was killed by a signal it did not ask for
    Signalled,
    /// Process was stopped because its cancel token fired
    Cancelled,
}

impl MirrorStatus {
    /// Exit 0, or 24 (some source files vanished mid-transfer).
    pub fn is_success(&self) -> bool {
        matches!(self, MirrorStatus::Exited(0) | MirrorStatus::Exited(RSYNC_VANISHED))
    }
}

impl fmt::Display for MirrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorStatus::Exited(code) => write!(f, "exited with code {}", code),
            MirrorStatus::Signalled => write!(f, "was killed by a signal"),
            MirrorStatus::Cancelled => write!(f, "was cancelled"),
        }
    }
}

/// The external mirroring tool.
///
/// Every method blocks for the duration of the transfer. Implementations must
/// be shareable across the sync worker and the drift-check thread.
pub trait Mirror: Send + Sync {
    /// Name of the tool (for logging)
    fn name(&self) -> &'static str;

    /// Upload the whole source tree without deleting anything on the target.
    fn full(&self, cancel: &CancelToken) -> MirrorwatchResult<MirrorStatus>;

    /// List target paths that no longer exist in the source, without
    /// touching the target.
    fn preview_deletions(&self) -> MirrorwatchResult<(MirrorStatus, Vec<String>)>;

    /// Delete target paths that no longer exist in the source. Nothing is
    /// uploaded.
    fn apply_deletions(&self) -> MirrorwatchResult<MirrorStatus>;

    /// Sync exactly `paths` (relative to the source root). Paths missing from
    /// the source are deleted from the target; parent directories are not
    /// implied and listed directories are not recursed into. The root entry
    /// `.` transfers nothing.
    fn incremental(
        &self,
        paths: &[String],
        cancel: &CancelToken,
    ) -> MirrorwatchResult<MirrorStatus>;
}
