//! Change notification sources
//!
//! Both backends feed one channel; the consumer only sees an
//! [`EventStream`]. The stream is closed when the producer goes away, which
//! the daemon treats as fatal.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::event::ChangeEvent;
use crate::error::{MirrorwatchError, MirrorwatchResult};

/// One framed item from a source: a change, or a line that could not be read.
pub type EventResult = Result<ChangeEvent, MirrorwatchError>;

/// Which notification mechanism to use
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process watcher (inotify, FSEvents, kqueue, ReadDirectoryChangesW)
    #[default]
    Notify,
    /// `inotifywait -m -r` child process (Linux, inotify-tools)
    Inotifywait,
}

/// Outcome of waiting on the stream
#[derive(Debug)]
pub enum Next {
    Event(EventResult),
    /// Nothing arrived before the timeout
    Idle,
    /// The producer is gone
    Closed,
}

/// Keeps the producer alive for as long as the stream is.
enum Producer {
    Notify { _watcher: RecommendedWatcher },
    Inotifywait(Child),
    Channel,
}

pub struct EventStream {
    rx: Receiver<EventResult>,
    producer: Producer,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let producer = match &self.producer {
            Producer::Notify { .. } => "notify",
            Producer::Inotifywait(_) => "inotifywait",
            Producer::Channel => "channel",
        };
        f.debug_struct("EventStream")
            .field("producer", &producer)
            .finish()
    }
}

impl EventStream {
    /// Start watching `root` recursively.
    pub fn open(backend: Backend, root: &Path) -> MirrorwatchResult<Self> {
        match backend {
            Backend::Notify => Self::open_notify(root),
            Backend::Inotifywait => Self::open_inotifywait(root),
        }
    }

    /// Stream fed by the caller; closes when every sender is dropped.
    pub fn from_channel(rx: Receiver<EventResult>) -> Self {
        Self {
            rx,
            producer: Producer::Channel,
        }
    }

    fn open_notify(root: &Path) -> MirrorwatchResult<Self> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for change in ChangeEvent::from_notify(event) {
                        let _ = tx.send(Ok(change));
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(MirrorwatchError::MalformedEvent {
                        line: format!("{:?}", err.paths),
                        reason: err.to_string(),
                    }));
                }
            },
            notify::Config::default(),
        )
        .map_err(watcher_error)?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(watcher_error)?;
        debug!(root = %root.display(), "notify watcher established");

        Ok(Self {
            rx,
            producer: Producer::Notify { _watcher: watcher },
        })
    }

    fn open_inotifywait(root: &Path) -> MirrorwatchResult<Self> {
        let mut child = Command::new("inotifywait")
            .args([
                "-m",
                "-r",
                "-q",
                "-e",
                "modify,move,create,delete,attrib,close_write",
                "--format",
                "%e %w%f",
            ])
            .arg(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| MirrorwatchError::Watcher {
                message: format!("failed to start inotifywait: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| MirrorwatchError::Watcher {
            message: "inotifywait stdout unavailable".to_string(),
        })?;

        let (tx, rx) = channel();
        thread::Builder::new()
            .name("inotifywait-reader".to_string())
            .spawn(move || read_lines(BufReader::new(stdout), &tx))?;
        debug!(root = %root.display(), pid = child.id(), "inotifywait started");

        Ok(Self {
            rx,
            producer: Producer::Inotifywait(child),
        })
    }

    /// Wait up to `timeout` for the next item.
    pub fn next_timeout(&mut self, timeout: Duration) -> Next {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Next::Event(item),
            Err(RecvTimeoutError::Timeout) => Next::Idle,
            Err(RecvTimeoutError::Disconnected) => Next::Closed,
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Producer::Inotifywait(child) = &mut self.producer {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn watcher_error(err: notify::Error) -> MirrorwatchError {
    MirrorwatchError::Watcher {
        message: err.to_string(),
    }
}

/// Frame newline-terminated lines into events until EOF or until the
/// receiving side hangs up. Lines that are not UTF-8 become malformed events.
pub(crate) fn read_lines<R: BufRead>(mut reader: R, tx: &Sender<EventResult>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                let item = match std::str::from_utf8(&buf) {
                    Ok(line) => ChangeEvent::parse_line(line),
                    Err(_) => Err(MirrorwatchError::MalformedEvent {
                        line: String::from_utf8_lossy(&buf).into_owned(),
                        reason: "not valid UTF-8".to_string(),
                    }),
                };
                if tx.send(item).is_err() {
                    break;
                }
            }
            Err(err) => {
                debug!(error = %err, "event source read failed");
                break;
            }
        }
    }
    debug!("event source reached end of stream");
}
