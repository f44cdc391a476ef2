//! Scenario: startup decisions before the watch loop begins.

use std::sync::Arc;

use mirrorwatch::daemon::{self, DaemonOptions, Outcome};
use mirrorwatch::prompt::Answer;
use mirrorwatch::{report, CancelToken, Config, MirrorwatchError, Reporter, WatchEvent};

use crate::common::{FailingMirror, LocalCopyMirror, TestEnv};

fn options(env: &TestEnv) -> DaemonOptions {
    DaemonOptions {
        source: env.source.path().to_path_buf(),
        target: env.target_arg(),
        config: Config::default(),
        json: false,
        assume_yes: false,
    }
}

/// Reporter that fires `stop` as soon as the watch loop begins.
fn stop_when_watching(stop: &CancelToken) -> Reporter {
    let stop = stop.clone();
    Arc::new(move |event: &WatchEvent| {
        if *event == WatchEvent::InitialSyncComplete {
            stop.cancel();
        }
    })
}

#[test]
fn scenario_quit_at_confirmation_leaves_target_untouched() {
    let env = TestEnv::new();
    env.write_source("new.txt", "fresh");
    env.write_target("stale.txt", "old");

    let source = daemon::validate_source(env.source.path()).unwrap();
    let mirror = Arc::new(LocalCopyMirror::new(&source, env.target.path()));

    let outcome = daemon::supervise(
        &source,
        &options(&env),
        mirror,
        report::silent(),
        |_| Ok(Answer::Quit),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(outcome, Outcome::Quit);
    assert!(env.target.path().join("stale.txt").exists());
    assert!(!env.target.path().join("new.txt").exists());
}

#[test]
fn scenario_declining_deletion_keeps_stale_files() {
    let env = TestEnv::new();
    env.write_source("new.txt", "fresh");
    env.write_target("stale.txt", "old");

    let source = daemon::validate_source(env.source.path()).unwrap();
    let mirror = Arc::new(LocalCopyMirror::new(&source, env.target.path()));
    let stop = CancelToken::new();

    let mut asked = false;
    let outcome = daemon::supervise(
        &source,
        &options(&env),
        mirror,
        stop_when_watching(&stop),
        |_| {
            asked = true;
            Ok(Answer::No)
        },
        &stop,
    )
    .unwrap();

    assert!(asked);
    assert_eq!(outcome, Outcome::Interrupted);
    assert!(env.target.path().join("stale.txt").exists());
    assert!(env.target.path().join("new.txt").exists());
}

#[test]
fn scenario_interrupt_at_confirmation_skips_initial_sync() {
    let env = TestEnv::new();
    env.write_source("new.txt", "fresh");
    env.write_target("stale.txt", "old");

    let source = daemon::validate_source(env.source.path()).unwrap();
    let mirror = Arc::new(LocalCopyMirror::new(&source, env.target.path()));
    let stop = CancelToken::new();

    let outcome = daemon::supervise(
        &source,
        &options(&env),
        mirror,
        report::silent(),
        |_| {
            // Signal arrives while the prompt waits for input
            stop.cancel();
            Ok(Answer::No)
        },
        &stop,
    )
    .unwrap();

    assert_eq!(outcome, Outcome::Interrupted);
    assert!(env.target.path().join("stale.txt").exists());
    assert!(!env.target.path().join("new.txt").exists());
}

#[test]
fn scenario_nothing_stale_skips_confirmation() {
    let env = TestEnv::new();
    env.write_source("a.txt", "a");

    let source = daemon::validate_source(env.source.path()).unwrap();
    let mirror = Arc::new(LocalCopyMirror::new(&source, env.target.path()));
    let stop = CancelToken::new();
    stop.cancel();

    let outcome = daemon::supervise(
        &source,
        &options(&env),
        mirror,
        report::silent(),
        |_| panic!("nothing to confirm"),
        &stop,
    )
    .unwrap();
    assert_eq!(outcome, Outcome::Interrupted);
}

#[test]
fn scenario_failed_initial_sync_is_fatal() {
    let env = TestEnv::new();
    env.write_source("a.txt", "a");

    let source = daemon::validate_source(env.source.path()).unwrap();
    let err = daemon::supervise(
        &source,
        &options(&env),
        Arc::new(FailingMirror(23)),
        report::silent(),
        |_| Ok(Answer::Yes),
        &CancelToken::new(),
    )
    .unwrap_err();

    assert!(matches!(err, MirrorwatchError::InitialSync { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("23"));
}
