//! Rsync mirror
//!
//! Drives the rsync binary for every mirror mode. Incremental passes hand the
//! path list to rsync through a `--files-from` file written into the daemon's
//! scratch directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::{Mirror, MirrorStatus};
use crate::cancel::CancelToken;
use crate::config::RsyncConfig;
use crate::error::MirrorwatchResult;

/// rsync exit code for "partial transfer due to vanished source files"
pub const RSYNC_VANISHED: i32 = 24;

/// How often a running child is checked for exit or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
enum Mode<'a> {
    Full,
    DeletePreview,
    DeleteApply,
    Incremental { files_from: &'a Path },
}

/// Mirror implementation using rsync
#[derive(Debug, Clone)]
pub struct RsyncMirror {
    program: String,
    remote_shell: Option<String>,
    extra_args: Vec<String>,
    /// Local source root
    source: PathBuf,
    /// Local path or `host:path`
    target: String,
    /// Directory for `--files-from` lists
    scratch: PathBuf,
    /// Send rsync's own stdout to /dev/null (NDJSON mode)
    quiet: bool,
}

impl RsyncMirror {
    pub fn new(config: &RsyncConfig, source: &Path, target: &str, scratch: &Path) -> Self {
        Self {
            program: config.program.clone(),
            remote_shell: config.remote_shell.clone(),
            extra_args: config.extra_args.clone(),
            source: source.to_path_buf(),
            target: target.to_string(),
            scratch: scratch.to_path_buf(),
            quiet: false,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Check if the rsync program is installed and runnable
    pub fn check_available(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn source_arg(&self) -> String {
        // trailing slash = copy contents
        format!("{}/", self.source.display().to_string().trim_end_matches('/'))
    }

    fn target_arg(&self) -> String {
        if self.target.ends_with('/') || self.target.ends_with(':') {
            self.target.clone()
        } else {
            format!("{}/", self.target)
        }
    }

    fn command(&self, mode: Mode<'_>) -> Command {
        let mut cmd = Command::new(&self.program);

        match mode {
            Mode::Full => {
                cmd.arg("-a");
            }
            Mode::DeletePreview => {
                cmd.args([
                    "-r",
                    "--delete",
                    "--existing",
                    "--ignore-existing",
                    "--dry-run",
                    "--itemize-changes",
                ]);
            }
            Mode::DeleteApply => {
                cmd.args(["-r", "--delete", "--existing", "--ignore-existing"]);
            }
            Mode::Incremental { files_from } => {
                cmd.args([
                    "-a",
                    "--dirs",
                    "--delete",
                    "--delete-missing-args",
                    "--no-implied-dirs",
                ]);
                cmd.arg(format!("--files-from={}", files_from.display()));
            }
        }

        if let Some(shell) = &self.remote_shell {
            cmd.arg("-e").arg(shell);
        }
        cmd.args(&self.extra_args);
        cmd.arg(self.source_arg()).arg(self.target_arg());
        cmd.stdin(Stdio::null());
        cmd
    }

    fn spawn(&self, mut cmd: Command) -> MirrorwatchResult<Child> {
        if self.quiet {
            cmd.stdout(Stdio::null());
        } else {
            cmd.stdout(Stdio::inherit());
        }
        cmd.stderr(Stdio::inherit());
        debug!(command = ?cmd, "spawning rsync");
        Ok(cmd.spawn()?)
    }

    fn write_files_from(&self, paths: &[&str]) -> MirrorwatchResult<tempfile::NamedTempFile> {
        let mut list = tempfile::Builder::new()
            .prefix("pass-")
            .suffix(".list")
            .tempfile_in(&self.scratch)?;
        for path in paths {
            writeln!(list, "{}", path)?;
        }
        list.flush()?;
        Ok(list)
    }
}

fn status_of(status: ExitStatus) -> MirrorStatus {
    match status.code() {
        Some(code) => MirrorStatus::Exited(code),
        None => MirrorStatus::Signalled,
    }
}

/// Wait for `child`, killing it if `cancel` fires first.
fn wait(mut child: Child, cancel: &CancelToken) -> MirrorwatchResult<MirrorStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status_of(status));
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(MirrorStatus::Cancelled);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Extract `*deleting` entries from `--itemize-changes` output.
pub(crate) fn parse_deletions(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("*deleting"))
        .map(|rest| rest.trim().to_string())
        .filter(|path| !path.is_empty())
        .collect()
}

impl Mirror for RsyncMirror {
    fn name(&self) -> &'static str {
        "rsync"
    }

    fn full(&self, cancel: &CancelToken) -> MirrorwatchResult<MirrorStatus> {
        let child = self.spawn(self.command(Mode::Full))?;
        wait(child, cancel)
    }

    fn preview_deletions(&self) -> MirrorwatchResult<(MirrorStatus, Vec<String>)> {
        let mut cmd = self.command(Mode::DeletePreview);
        cmd.stderr(Stdio::inherit());
        debug!(command = ?cmd, "spawning rsync");
        let output = cmd.output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok((status_of(output.status), parse_deletions(&stdout)))
    }

    fn apply_deletions(&self) -> MirrorwatchResult<MirrorStatus> {
        let child = self.spawn(self.command(Mode::DeleteApply))?;
        wait(child, &CancelToken::new())
    }

    fn incremental(
        &self,
        paths: &[String],
        cancel: &CancelToken,
    ) -> MirrorwatchResult<MirrorStatus> {
        // With `--dirs` a `.` entry copies the root's contents and `--delete`
        // prunes it. Root attributes are left to the full mirror.
        let paths: Vec<&str> = paths
            .iter()
            .map(String::as_str)
            .filter(|path| *path != ".")
            .collect();
        if paths.is_empty() {
            debug!("only the source root changed, nothing to transfer");
            return Ok(MirrorStatus::Exited(0));
        }

        // Removed when dropped, after rsync has exited.
        let list = self.write_files_from(&paths)?;
        let child = self.spawn(self.command(Mode::Incremental {
            files_from: list.path(),
        }))?;
        wait(child, cancel)
    }
}
