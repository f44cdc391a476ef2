//! Drift check
//!
//! The notification sources miss some events (moves into watched trees,
//! directories created between recursive watch setup and the first event,
//! queue overflows). After every return to quiescence a full non-deleting
//! mirror runs in the background to repair whatever was missed. A new run
//! cancels the previous one; overlap while the old rsync is being killed is
//! tolerated. Once closed at shutdown the runner starts nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, info, warn};

use super::Inner;
use crate::cancel::CancelToken;
use crate::error::MirrorwatchResult;
use crate::mirror::{Mirror, MirrorStatus};
use crate::report::{Reporter, WatchEvent};

/// Identifies the live drift check so a successor can cancel it.
#[derive(Debug, Clone)]
pub struct DriftHandle {
    pub id: u64,
    cancel: CancelToken,
}

#[derive(Debug, Default)]
struct Slot {
    live: Option<DriftHandle>,
    /// Set by [`DriftRunner::close`]; no run starts afterwards.
    closed: bool,
}

#[derive(Debug, Default)]
pub struct DriftRunner {
    slot: Mutex<Slot>,
    next_id: AtomicU64,
}

impl DriftRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one full non-deleting mirror, superseding any run in progress.
    /// Returns [`MirrorStatus::Cancelled`] without touching the mirror once
    /// the runner is closed.
    pub fn run(&self, mirror: &dyn Mirror, reporter: &Reporter) -> MirrorwatchResult<MirrorStatus> {
        let Some(handle) = self.supersede() else {
            debug!("drift check skipped after shutdown");
            return Ok(MirrorStatus::Cancelled);
        };
        let run = handle.id;
        debug!(run, "drift check started");
        reporter(&WatchEvent::DriftCheckStarted { run });

        let result = mirror.full(&handle.cancel);
        self.release(run);

        let status = match &result {
            Ok(MirrorStatus::Cancelled) => {
                debug!(run, "drift check superseded");
                MirrorStatus::Cancelled.to_string()
            }
            Ok(status) if status.is_success() => {
                info!(run, "drift check complete");
                status.to_string()
            }
            Ok(status) => {
                warn!(run, %status, "drift check failed");
                status.to_string()
            }
            Err(err) => {
                warn!(run, error = %err, "drift check failed");
                err.to_string()
            }
        };
        reporter(&WatchEvent::DriftCheckFinished { run, status });

        result
    }

    /// Cancel the recorded predecessor and record a fresh handle. `None`
    /// once closed.
    fn supersede(&self) -> Option<DriftHandle> {
        let mut slot = self.lock();
        if slot.closed {
            return None;
        }
        if let Some(previous) = slot.live.take() {
            debug!(run = previous.id, "cancelling previous drift check");
            previous.cancel.cancel();
        }
        let handle = DriftHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            cancel: CancelToken::new(),
        };
        slot.live = Some(handle.clone());
        Some(handle)
    }

    /// Forget `id` unless a newer run already took its place.
    fn release(&self, id: u64) {
        let mut slot = self.lock();
        if slot.live.as_ref().map(|h| h.id) == Some(id) {
            slot.live = None;
        }
    }

    /// Id of the live run, if any
    pub fn current(&self) -> Option<u64> {
        self.lock().live.as_ref().map(|h| h.id)
    }

    /// Cancel the live run and refuse every later one.
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        if let Some(handle) = slot.live.take() {
            handle.cancel.cancel();
        }
    }
}

/// Start a drift check on its own thread; nothing waits for it.
pub(super) fn launch(inner: Arc<Inner>) {
    let spawned = thread::Builder::new()
        .name("drift-check".to_string())
        .spawn(move || {
            let _ = inner.drift.run(inner.mirror.as_ref(), &inner.reporter);
        });
    if let Err(err) = spawned {
        warn!(error = %err, "failed to start drift check");
    }
}
