//! Change events and their framing

use std::path::PathBuf;

use notify::event::{AccessKind, AccessMode, EventKind, ModifyKind};
use serde::Serialize;

use crate::error::MirrorwatchError;

/// What happened to a path. Advisory only: every kind means "sync this
/// path again".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Modify,
    Move,
    Create,
    Delete,
    Attrib,
    CloseWrite,
    /// Events were lost (kernel queue overflow); the path is empty and the
    /// whole tree must be rechecked.
    Rescan,
}

impl ChangeOp {
    /// Map one inotify event flag (as printed by `inotifywait %e`).
    pub fn from_inotify_flag(flag: &str) -> Option<Self> {
        match flag {
            "MODIFY" => Some(ChangeOp::Modify),
            "MOVED_FROM" | "MOVED_TO" | "MOVE" | "MOVE_SELF" => Some(ChangeOp::Move),
            "CREATE" => Some(ChangeOp::Create),
            "DELETE" | "DELETE_SELF" => Some(ChangeOp::Delete),
            "ATTRIB" => Some(ChangeOp::Attrib),
            "CLOSE_WRITE" => Some(ChangeOp::CloseWrite),
            _ => None,
        }
    }

    /// Map a `notify` event kind. Reads and non-writing closes are ignored.
    pub fn from_notify_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeOp::Create),
            EventKind::Remove(_) => Some(ChangeOp::Delete),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeOp::Move),
            EventKind::Modify(ModifyKind::Metadata(_)) => Some(ChangeOp::Attrib),
            EventKind::Modify(_) => Some(ChangeOp::Modify),
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(ChangeOp::CloseWrite),
            EventKind::Access(_) => None,
            _ => Some(ChangeOp::Modify),
        }
    }
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(op: ChangeOp, path: impl Into<PathBuf>) -> Self {
        Self {
            op,
            path: path.into(),
        }
    }

    /// Parse an `inotifywait --format '%e %w%f'` line, e.g.
    /// `CLOSE_WRITE,CLOSE /data/src/notes.txt`.
    ///
    /// The first recognised flag decides the op; flags such as `ISDIR` or
    /// `CLOSE` are ignored. `Q_OVERFLOW` carries no path and becomes a
    /// [`ChangeOp::Rescan`].
    pub fn parse_line(line: &str) -> Result<Self, MirrorwatchError> {
        let malformed = |reason: &str| MirrorwatchError::MalformedEvent {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let (flags, path) = line.split_once(' ').unwrap_or((line, ""));
        if flags.split(',').any(|flag| flag == "Q_OVERFLOW") {
            return Ok(Self::rescan());
        }
        if flags.is_empty() {
            return Err(malformed("missing event flags"));
        }
        if path.is_empty() {
            return Err(malformed("missing path"));
        }

        let op = flags
            .split(',')
            .find_map(ChangeOp::from_inotify_flag)
            .ok_or_else(|| malformed("no recognised event flag"))?;

        Ok(Self::new(op, path))
    }

    /// The "events were lost" marker
    pub fn rescan() -> Self {
        Self::new(ChangeOp::Rescan, PathBuf::new())
    }

    /// Split a `notify` event into one change per path. A rescan request
    /// becomes a single [`ChangeOp::Rescan`].
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        if event.need_rescan() {
            return vec![Self::rescan()];
        }
        match ChangeOp::from_notify_kind(&event.kind) {
            Some(op) => event
                .paths
                .into_iter()
                .map(|path| Self::new(op, path))
                .collect(),
            None => Vec::new(),
        }
    }
}
