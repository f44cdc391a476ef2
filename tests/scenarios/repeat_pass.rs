//! Scenario: the same change set is synced again with nothing changed in
//! between.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mirrorwatch::{report, Engine, EngineOptions};

use crate::common::{walk, LocalCopyMirror, TestEnv};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Every entry under `root` with its content, `None` for directories.
fn contents(root: &Path) -> Vec<(String, Option<String>)> {
    walk(root)
        .unwrap()
        .into_iter()
        .map(|relative| {
            let content = fs::read_to_string(root.join(&relative)).ok();
            (relative, content)
        })
        .collect()
}

#[test]
fn scenario_second_pass_over_same_paths_changes_nothing() {
    let env = TestEnv::new();
    env.write_source("a.txt", "alpha");
    env.write_source("nested/b.txt", "beta");
    env.write_target("a.txt", "old alpha");
    env.write_target("gone/x.txt", "x");
    env.write_target("gone/deep/y.txt", "y");
    env.write_target("kept.txt", "kept");

    let source = env.source.path().canonicalize().unwrap();
    let mirror = Arc::new(LocalCopyMirror::new(&source, env.target.path()));
    let engine = Engine::new(
        mirror.clone(),
        EngineOptions {
            coalesce_delay: Duration::from_millis(20),
            retry_backoff: Duration::from_millis(20),
            drift_check: false,
        },
        report::silent(),
    );

    let paths = [
        ".",
        "a.txt",
        "gone",
        "gone/deep",
        "gone/deep/y.txt",
        "gone/x.txt",
        "nested",
        "nested/b.txt",
    ];

    for path in paths {
        engine.enqueue(path);
    }
    assert!(engine.wait_quiescent(TIMEOUT));
    let after_first = contents(env.target.path());

    for path in paths {
        engine.enqueue(path);
    }
    assert!(engine.wait_quiescent(TIMEOUT));

    assert_eq!(contents(env.target.path()), after_first);
    assert_eq!(
        after_first,
        vec![
            ("a.txt".to_string(), Some("alpha".to_string())),
            ("kept.txt".to_string(), Some("kept".to_string())),
            ("nested".to_string(), None),
            ("nested/b.txt".to_string(), Some("beta".to_string())),
        ]
    );
    assert_eq!(mirror.incremental_calls.lock().unwrap().len(), 2);
    assert_eq!(engine.passes(), 2);
}
