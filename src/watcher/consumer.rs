//! Change event consumer
//!
//! Drains an [`EventStream`] on the calling thread and hands every changed
//! path, relative to the source root, to `on_change`. Lost events surface as
//! [`Change::Rescan`].

use std::path::Path;
use std::time::Duration;

use tracing::{error, trace, warn};

use super::event::ChangeOp;
use super::source::{EventStream, Next};
use crate::cancel::CancelToken;
use crate::error::{MirrorwatchError, MirrorwatchResult};

/// How often the stop token is checked while the source is idle
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What the consumer hands downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change<'a> {
    /// A path relative to the source root
    Path(&'a str),
    /// Events were dropped; everything may be stale
    Rescan,
}

/// Consume events until `stop` fires (returns `Ok`) or the source closes
/// (returns [`MirrorwatchError::ProducerTerminated`]).
///
/// Malformed events and paths that cannot be expressed relative to `root`
/// are logged and skipped.
pub fn consume(
    stream: &mut EventStream,
    root: &Path,
    stop: &CancelToken,
    mut on_change: impl FnMut(Change<'_>),
) -> MirrorwatchResult<()> {
    while !stop.is_cancelled() {
        match stream.next_timeout(POLL_INTERVAL) {
            Next::Event(Ok(event)) if event.op == ChangeOp::Rescan => {
                warn!("change notifications were dropped, rechecking the whole tree");
                on_change(Change::Rescan);
            }
            Next::Event(Ok(event)) => match relative_path(root, &event.path) {
                Ok(path) => {
                    trace!(op = ?event.op, path = %path, "change");
                    on_change(Change::Path(&path));
                }
                Err(err) => warn!(error = %err, "skipping change event"),
            },
            Next::Event(Err(err)) => warn!(error = %err, "skipping change event"),
            Next::Idle => {}
            Next::Closed => {
                error!("change notification source terminated");
                return Err(MirrorwatchError::ProducerTerminated);
            }
        }
    }
    Ok(())
}

/// `path` relative to `root`, as UTF-8. The root itself maps to `.`.
pub fn relative_path(root: &Path, path: &Path) -> MirrorwatchResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| MirrorwatchError::MalformedEvent {
            line: path.display().to_string(),
            reason: "path is outside the source tree".to_string(),
        })?;

    if relative.as_os_str().is_empty() {
        return Ok(".".to_string());
    }

    relative
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| MirrorwatchError::UnrepresentablePath {
            path: path.to_string_lossy().into_owned(),
        })
}
