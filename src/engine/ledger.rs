//! Pending-change ledger
//!
//! Paths waiting for the next incremental pass. Appends and rotation go
//! through one mutex, so an append racing a rotation lands either in the
//! snapshot being taken or in the fresh ledger, never both and never neither.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::error::MirrorwatchError;

/// Append-only list of relative paths awaiting sync. Duplicates are kept
/// until rotation.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<Vec<String>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` for the next pass.
    ///
    /// Paths containing a line break cannot be written to the line-oriented
    /// file list handed to rsync; they are dropped with a warning and the
    /// error is returned for reporting. Never blocks beyond the mutex.
    pub fn append(&self, path: &str) -> Result<(), MirrorwatchError> {
        if !is_representable(path) {
            warn!(path = ?path, "dropping path containing a line break");
            return Err(MirrorwatchError::UnrepresentablePath {
                path: path.to_string(),
            });
        }

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
        Ok(())
    }

    /// Swap in an empty ledger and return what was there.
    pub fn rotate(&self) -> SyncSnapshot {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let paths = std::mem::take(&mut *entries);
        SyncSnapshot { paths }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_representable(path: &str) -> bool {
    !path.contains(['\n', '\r'])
}

/// Paths owned by one running pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    paths: Vec<String>,
}

impl SyncSnapshot {
    /// Collapse duplicates. Resulting order is sorted.
    pub fn dedup(self) -> Self {
        let unique: BTreeSet<String> = self.paths.into_iter().collect();
        Self {
            paths: unique.into_iter().collect(),
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}

impl FromIterator<String> for SyncSnapshot {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}
