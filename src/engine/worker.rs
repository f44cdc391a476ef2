//! Sync worker: one thread per run of consecutive passes.

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use super::{drift, Inner, SyncSnapshot};
use crate::error::MirrorwatchError;
use crate::report::WatchEvent;

pub(super) fn spawn(inner: Arc<Inner>) -> io::Result<()> {
    thread::Builder::new()
        .name("sync-pass".to_string())
        .spawn(move || run(inner))?;
    Ok(())
}

fn run(inner: Arc<Inner>) {
    loop {
        if !inner.shutdown.sleep(inner.options.coalesce_delay) {
            inner.gate.reset();
            return;
        }

        let mut snapshot = inner.ledger.rotate().dedup();
        if !drain(&inner, &mut snapshot) {
            debug!(abandoned = snapshot.len(), "sync pass stopped by shutdown");
            inner.gate.reset();
            return;
        }

        if !inner.gate.finish_pass() {
            break;
        }
        debug!("changes arrived during the pass, going again");
    }

    debug!("sync engine quiescent");
    (inner.reporter)(&WatchEvent::Quiescent);

    if inner.options.drift_check {
        drift::launch(inner);
    }
}

/// Mirror `snapshot` until it succeeds. Returns `false` if shutdown
/// interrupted the pass.
fn drain(inner: &Inner, snapshot: &mut SyncSnapshot) -> bool {
    if snapshot.is_empty() {
        return true;
    }

    let pass = inner.passes.fetch_add(1, Ordering::SeqCst) + 1;
    let paths = snapshot.len();
    info!(pass, paths, "syncing changed paths");
    (inner.reporter)(&WatchEvent::PassStarted { pass, paths });

    let mut attempt: u32 = 0;
    while !snapshot.is_empty() {
        attempt += 1;
        let failure = match inner.mirror.incremental(snapshot.paths(), &inner.shutdown) {
            Ok(status) if status.is_success() => {
                snapshot.clear();
                continue;
            }
            Ok(status) => MirrorwatchError::Transfer { status },
            Err(err) => err,
        };

        if inner.shutdown.is_cancelled() {
            return false;
        }

        // No retry limit: the same snapshot is retried until it goes through.
        warn!(
            pass,
            attempt,
            error = %failure,
            backoff = ?inner.options.retry_backoff,
            "incremental sync failed, retrying"
        );
        (inner.reporter)(&WatchEvent::PassRetry {
            pass,
            attempt,
            status: failure.to_string(),
        });

        if !inner.shutdown.sleep(inner.options.retry_backoff) {
            return false;
        }
    }

    info!(pass, paths, attempts = attempt, "sync pass complete");
    (inner.reporter)(&WatchEvent::PassComplete {
        pass,
        paths,
        attempts: attempt,
    });
    true
}
