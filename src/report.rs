//! Lifecycle events for `--json` output
//!
//! The engine reports what it is doing through a [`Reporter`] callback. In
//! NDJSON mode the binary prints each event as one line on stdout; otherwise
//! the callback is a no-op and `tracing` carries the same information.

use std::sync::Arc;

use serde::Serialize;

/// Callback invoked for every lifecycle event
pub type Reporter = Arc<dyn Fn(&WatchEvent) + Send + Sync>;

/// Reporter that drops every event
pub fn silent() -> Reporter {
    Arc::new(|_| {})
}

/// Reporter that prints NDJSON lines to stdout
pub fn ndjson() -> Reporter {
    Arc::new(|event| println!("{}", event.to_json()))
}

/// Watch event types for NDJSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    WatchStarted {
        source: String,
        target: String,
    },
    DeletionsPreviewed {
        paths: Vec<String>,
    },
    InitialSyncComplete,
    PassStarted {
        pass: u64,
        paths: usize,
    },
    PassRetry {
        pass: u64,
        attempt: u32,
        status: String,
    },
    PassComplete {
        pass: u64,
        paths: usize,
        attempts: u32,
    },
    Quiescent,
    DriftCheckStarted {
        run: u64,
    },
    DriftCheckFinished {
        run: u64,
        status: String,
    },
    PathDropped {
        path: String,
        reason: String,
    },
    Shutdown,
}

impl WatchEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
