//! Sync activity gate
//!
//! Three-state machine that keeps at most one pass running and remembers
//! whether anything arrived while it ran:
//!
//! ```text
//! Quiescent --request--> Active --request--> ActivePending
//!     ^                    |  ^                   |
//!     +----finish_pass-----+  +----finish_pass----+
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    /// No pass running
    Quiescent,
    /// One pass running, nothing new since it started
    Active,
    /// One pass running and at least one change arrived after it started
    ActivePending,
}

#[derive(Debug)]
pub struct Gate {
    state: Mutex<ActivityState>,
    idle: Condvar,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            state: Mutex::new(ActivityState::Quiescent),
            idle: Condvar::new(),
        }
    }
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ActivityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Note that a change is waiting.
    ///
    /// Returns `true` when the caller moved the gate out of quiescence and
    /// must start a worker. Repeated calls while a pass runs collapse into a
    /// single pending flag.
    pub fn request(&self) -> bool {
        let mut state = self.lock();
        match *state {
            ActivityState::Quiescent => {
                *state = ActivityState::Active;
                true
            }
            ActivityState::Active => {
                *state = ActivityState::ActivePending;
                false
            }
            ActivityState::ActivePending => false,
        }
    }

    /// Called by the worker when its snapshot is drained.
    ///
    /// Returns `true` if changes arrived during the pass; the flag is cleared
    /// and the worker must run another pass without going quiescent.
    pub fn finish_pass(&self) -> bool {
        let mut state = self.lock();
        match *state {
            ActivityState::ActivePending => {
                *state = ActivityState::Active;
                true
            }
            ActivityState::Active | ActivityState::Quiescent => {
                *state = ActivityState::Quiescent;
                self.idle.notify_all();
                false
            }
        }
    }

    /// Force quiescence (worker abandoned on shutdown or never started).
    pub fn reset(&self) {
        *self.lock() = ActivityState::Quiescent;
        self.idle.notify_all();
    }

    pub fn state(&self) -> ActivityState {
        *self.lock()
    }

    /// Block until quiescent or `timeout` elapses. Returns whether the gate
    /// is quiescent.
    pub fn wait_quiescent(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .idle
            .wait_timeout_while(guard, timeout, |state| *state != ActivityState::Quiescent)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == ActivityState::Quiescent
    }
}
