//! Daemon lifecycle
//!
//! 1. validate the source
//! 2. preview target paths missing from the source, confirm, delete (a stop
//!    signal abandons the prompt)
//! 3. start watching (before the full sync so nothing written during it is
//!    missed)
//! 4. full sync
//! 5. feed change events into the engine until stopped or the source dies
//!
//! All temporary files live in one directory from [`scratch_dir`]. The
//! caller owns it so a signal handler can remove it before a forced exit.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use is_terminal::IsTerminal;
use tempfile::TempDir;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::engine::{Engine, EngineOptions};
use crate::error::{MirrorwatchError, MirrorwatchResult};
use crate::mirror::{Mirror, RsyncMirror};
use crate::prompt::{self, Answer};
use crate::report::{self, Reporter, WatchEvent};
use crate::watcher::{consume, Change, EventStream, POLL_INTERVAL};

/// How long shutdown waits for an in-flight pass
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Daemon options
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Local directory to mirror
    pub source: PathBuf,
    /// Local path or `[user@]host:path`
    pub target: String,
    pub config: Config,
    /// Output as NDJSON
    pub json: bool,
    /// Delete stale target paths without asking
    pub assume_yes: bool,
}

/// How a daemon run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// User answered "quit" at the delete confirmation
    Quit,
    /// Stop token fired (Ctrl+C)
    Interrupted,
}

enum Reconcile {
    Continue,
    Quit,
}

/// Fresh `mirrorwatch-*` directory under the system temp dir, removed when
/// dropped.
pub fn scratch_dir() -> MirrorwatchResult<TempDir> {
    Ok(tempfile::Builder::new().prefix("mirrorwatch-").tempdir()?)
}

/// Run the daemon against rsync until `stop` fires or a fatal error occurs.
/// Temporary files go in `scratch`.
pub fn run(
    options: &DaemonOptions,
    scratch: &Path,
    stop: &CancelToken,
) -> MirrorwatchResult<Outcome> {
    let source = validate_source(&options.source)?;

    let mirror = RsyncMirror::new(&options.config.rsync, &source, &options.target, scratch)
        .with_quiet(options.json);
    if !RsyncMirror::check_available(&options.config.rsync.program) {
        warn!(program = %options.config.rsync.program, "rsync does not appear to be runnable");
    }

    let reporter = if options.json {
        report::ndjson()
    } else {
        report::silent()
    };
    let assume_yes = options.assume_yes;

    supervise(
        &source,
        options,
        Arc::new(mirror),
        reporter,
        |paths| confirm_on_terminal(paths, assume_yes, stop),
        stop,
    )
}

/// Canonical source directory, or [`MirrorwatchError::SourceNotDirectory`].
pub fn validate_source(source: &Path) -> MirrorwatchResult<PathBuf> {
    match source.canonicalize() {
        Ok(path) if path.is_dir() => Ok(path),
        _ => Err(MirrorwatchError::SourceNotDirectory {
            path: source.to_path_buf(),
        }),
    }
}

/// Steps 2-5 of the lifecycle against any [`Mirror`].
///
/// `source` must already be canonical. `confirm` is only called when the
/// preview found something to delete. If `stop` fires while it runs, the
/// daemon returns [`Outcome::Interrupted`] before the initial sync.
pub fn supervise(
    source: &Path,
    options: &DaemonOptions,
    mirror: Arc<dyn Mirror>,
    reporter: Reporter,
    confirm: impl FnOnce(&[String]) -> MirrorwatchResult<Answer>,
    stop: &CancelToken,
) -> MirrorwatchResult<Outcome> {
    info!(source = %source.display(), target = %options.target, "mirrorwatch starting");
    reporter(&WatchEvent::WatchStarted {
        source: source.display().to_string(),
        target: options.target.clone(),
    });

    let reconciled = reconcile_deletions(mirror.as_ref(), &reporter, confirm)?;
    if stop.is_cancelled() {
        return Ok(Outcome::Interrupted);
    }
    if let Reconcile::Quit = reconciled {
        info!("quit requested at delete confirmation");
        return Ok(Outcome::Quit);
    }

    let mut stream = EventStream::open(options.config.watcher.backend, source)?;

    info!("running initial full sync");
    let status = mirror
        .full(stop)
        .map_err(|err| MirrorwatchError::InitialSync {
            reason: err.to_string(),
        })?;
    if stop.is_cancelled() {
        return Ok(Outcome::Interrupted);
    }
    if !status.is_success() {
        return Err(MirrorwatchError::InitialSync {
            reason: format!("{} {}", mirror.name(), status),
        });
    }
    info!("initial sync complete, watching for changes");
    reporter(&WatchEvent::InitialSyncComplete);

    let engine = Engine::new(mirror, EngineOptions::from(&options.config), reporter.clone());
    let consumed = consume(&mut stream, source, stop, |change| match change {
        Change::Path(path) => engine.enqueue(path),
        // An empty pass still ends in a drift check
        Change::Rescan => engine.request_sync(),
    });

    engine.shutdown();
    if !engine.wait_quiescent(SHUTDOWN_GRACE) {
        warn!("sync pass still running at shutdown");
    }
    reporter(&WatchEvent::Shutdown);

    consumed.map(|()| Outcome::Interrupted)
}

fn reconcile_deletions(
    mirror: &dyn Mirror,
    reporter: &Reporter,
    confirm: impl FnOnce(&[String]) -> MirrorwatchResult<Answer>,
) -> MirrorwatchResult<Reconcile> {
    let (status, paths) = match mirror.preview_deletions() {
        Ok(preview) => preview,
        Err(err) => {
            warn!(error = %err, "could not preview deletions, skipping");
            return Ok(Reconcile::Continue);
        }
    };
    if !status.is_success() {
        warn!(%status, "could not preview deletions, skipping");
        return Ok(Reconcile::Continue);
    }
    if paths.is_empty() {
        return Ok(Reconcile::Continue);
    }

    reporter(&WatchEvent::DeletionsPreviewed {
        paths: paths.clone(),
    });

    match confirm(&paths)? {
        Answer::Yes => {
            info!(count = paths.len(), "deleting stale paths from target");
            let status = mirror
                .apply_deletions()
                .map_err(|err| MirrorwatchError::InitialSync {
                    reason: err.to_string(),
                })?;
            if !status.is_success() {
                return Err(MirrorwatchError::InitialSync {
                    reason: format!("deleting stale paths: {} {}", mirror.name(), status),
                });
            }
            Ok(Reconcile::Continue)
        }
        Answer::No => {
            info!(count = paths.len(), "keeping stale paths on target");
            Ok(Reconcile::Continue)
        }
        Answer::Quit => Ok(Reconcile::Quit),
    }
}

fn confirm_on_terminal(
    paths: &[String],
    assume_yes: bool,
    stop: &CancelToken,
) -> MirrorwatchResult<Answer> {
    if assume_yes {
        return Ok(Answer::Yes);
    }

    if !io::stdin().is_terminal() {
        warn!(
            count = paths.len(),
            "stdin is not a terminal, keeping stale paths on target (pass --yes to delete them)"
        );
        return Ok(Answer::No);
    }

    let paths = paths.to_vec();
    let answer = ask_until_stopped(stop, move || {
        prompt::confirm_deletions(&paths, &mut io::stdin().lock(), &mut io::stderr())
    })?;
    // Interrupted: delete nothing, the caller sees `stop`
    Ok(answer.unwrap_or(Answer::No))
}

/// Run `ask` on its own thread so `stop` is noticed while it blocks on
/// input. `None` if `stop` fired first; the blocked thread is abandoned.
fn ask_until_stopped(
    stop: &CancelToken,
    ask: impl FnOnce() -> io::Result<Answer> + Send + 'static,
) -> MirrorwatchResult<Option<Answer>> {
    let (tx, rx) = channel();
    thread::Builder::new()
        .name("confirm".to_string())
        .spawn(move || {
            let _ = tx.send(ask());
        })?;

    while !stop.is_cancelled() {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(answer) => return Ok(Some(answer?)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                let err = io::Error::other("confirmation prompt exited without an answer");
                return Err(err.into());
            }
        }
    }
    Ok(None)
}
