//! Isolated environment for running the mirrorwatch binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Result of running the CLI
#[derive(Debug)]
pub struct TestResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Temp directories for one test.
///
/// `HOME`, `XDG_CONFIG_HOME` and `TMPDIR` all point inside the environment so
/// neither the user config nor leftover scratch directories leak between
/// tests.
pub struct TestEnv {
    pub source: TempDir,
    pub target: TempDir,
    pub home: TempDir,
    pub tmp: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            source: TempDir::new().unwrap(),
            target: TempDir::new().unwrap(),
            home: TempDir::new().unwrap(),
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn write_source(&self, relative: &str, content: &str) {
        write_file(&self.source.path().join(relative), content);
    }

    pub fn write_target(&self, relative: &str, content: &str) {
        write_file(&self.target.path().join(relative), content);
    }

    pub fn source_arg(&self) -> String {
        self.source.path().display().to_string()
    }

    pub fn target_arg(&self) -> String {
        self.target.path().display().to_string()
    }

    /// Scratch directories the daemon left behind in `TMPDIR`
    pub fn leftover_scratch(&self) -> Vec<PathBuf> {
        fs::read_dir(self.tmp.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("mirrorwatch-"))
            })
            .collect()
    }

    fn command(&self, args: &[&str], envs: &[(&str, &str)]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mirrorwatch"));
        cmd.args(args)
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env("TMPDIR", self.tmp.path())
            .env_remove("RUST_LOG")
            .stdin(Stdio::null());
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run the binary to completion with stdin closed.
    pub fn run(&self, args: &[&str], envs: &[(&str, &str)]) -> TestResult {
        let output = self
            .command(args, envs)
            .output()
            .expect("failed to run mirrorwatch");
        TestResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Start the binary in the background with stdout piped and stderr
    /// discarded.
    pub fn spawn(&self, args: &[&str], envs: &[(&str, &str)]) -> Child {
        self.command(args, envs)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to start mirrorwatch")
    }
}

/// Exit code of `child`, or `None` (after killing it) if it is still running
/// at `timeout`.
pub fn wait_for_exit(child: &mut Child, timeout: Duration) -> Option<i32> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return status.code();
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = child.kill();
    let _ = child.wait();
    None
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
