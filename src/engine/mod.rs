//! Change-coalescing sync engine
//!
//! Turns a stream of changed paths into serialized incremental mirror
//! passes:
//! - every change is appended to the [`Ledger`] and pokes the [`Gate`]
//! - the gate starts at most one worker thread at a time
//! - the worker rotates the ledger into a snapshot, dedups it and retries
//!   the mirror until the snapshot is empty
//! - changes that arrive mid-pass force another pass before quiescence
//! - each return to quiescence launches a full non-deleting drift check

mod drift;
mod gate;
mod ledger;
mod worker;

pub use drift::{DriftHandle, DriftRunner};
pub use gate::{ActivityState, Gate};
pub use ledger::{Ledger, SyncSnapshot};

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::mirror::Mirror;
use crate::report::{Reporter, WatchEvent};

/// Engine tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Delay before each rotation so bursts land in one snapshot
    pub coalesce_delay: Duration,
    /// Fixed wait between attempts of a failed pass
    pub retry_backoff: Duration,
    /// Run a full non-deleting mirror whenever the engine goes quiescent
    pub drift_check: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            coalesce_delay: config.sync.coalesce_delay(),
            retry_backoff: config.sync.retry_backoff(),
            drift_check: config.drift.enabled,
        }
    }
}

/// State shared between the consumer, the pass worker and the drift thread.
struct Inner {
    ledger: Ledger,
    gate: Gate,
    drift: DriftRunner,
    mirror: Arc<dyn Mirror>,
    options: EngineOptions,
    reporter: Reporter,
    shutdown: CancelToken,
    passes: AtomicU64,
}

/// Handle to the sync engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("mirror", &self.inner.mirror.name())
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Engine {
    pub fn new(mirror: Arc<dyn Mirror>, options: EngineOptions, reporter: Reporter) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger: Ledger::new(),
                gate: Gate::new(),
                drift: DriftRunner::new(),
                mirror,
                options,
                reporter,
                shutdown: CancelToken::new(),
                passes: AtomicU64::new(0),
            }),
        }
    }

    /// Record a changed path (relative to the source root) and request a
    /// pass. Unrepresentable paths are dropped and reported.
    pub fn enqueue(&self, path: &str) {
        if let Err(err) = self.inner.ledger.append(path) {
            (self.inner.reporter)(&WatchEvent::PathDropped {
                path: path.to_string(),
                reason: err.to_string(),
            });
        }
        self.request_sync();
    }

    /// Start a pass if none is running, otherwise flag the running one to
    /// go again. O(1); never waits for a pass.
    pub fn request_sync(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        if self.inner.gate.request() {
            if let Err(err) = worker::spawn(self.inner.clone()) {
                error!(error = %err, "failed to start sync worker");
                self.inner.gate.reset();
            }
        }
    }

    pub fn state(&self) -> ActivityState {
        self.inner.gate.state()
    }

    /// Paths appended since the last rotation
    pub fn pending(&self) -> usize {
        self.inner.ledger.len()
    }

    /// Number of passes started so far
    pub fn passes(&self) -> u64 {
        self.inner.passes.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Block until no pass is running or `timeout` elapses.
    pub fn wait_quiescent(&self, timeout: Duration) -> bool {
        self.inner.gate.wait_quiescent(timeout)
    }

    /// Stop accepting work, abandon retries at their next suspension point
    /// and cancel the running drift check. No drift check starts afterwards.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.drift.close();
    }
}
