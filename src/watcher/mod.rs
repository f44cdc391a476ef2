//! File watcher for continuous sync
//!
//! - `event`: change events and `inotifywait` line framing
//! - `source`: notify / inotifywait backends behind one stream
//! - `consumer`: drains the stream into the sync engine

mod consumer;
mod event;
mod source;

pub use consumer::{consume, relative_path, Change, POLL_INTERVAL};
pub use event::{ChangeEvent, ChangeOp};
pub use source::{Backend, EventResult, EventStream, Next};
