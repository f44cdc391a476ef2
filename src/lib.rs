//! mirrorwatch - continuous one-way directory mirroring
//!
//! Watches a local source tree and keeps a local or remote target in step
//! using rsync. Change notifications are appended to an in-memory ledger;
//! a single background worker rotates the ledger, deduplicates it and runs
//! one incremental rsync per batch, retrying until it succeeds. Whenever
//! the engine goes quiet a full non-deleting rsync repairs any events the
//! watcher missed.

pub mod cancel;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod mirror;
pub mod prompt;
pub mod report;
pub mod watcher;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use config::{Config, ConfigWarning};
pub use daemon::{DaemonOptions, Outcome};
pub use engine::{ActivityState, Engine, EngineOptions, SyncSnapshot};
pub use error::{MirrorwatchError, MirrorwatchResult};
pub use mirror::{Mirror, MirrorStatus, RsyncMirror};
pub use report::{Reporter, WatchEvent};
pub use watcher::{consume, Backend, Change, ChangeEvent, ChangeOp, EventStream};
