//! Test mirrors.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mirrorwatch::{CancelToken, Mirror, MirrorStatus, MirrorwatchResult};

/// Copies with `std::fs`, following the same contract as the rsync mirror:
/// `full` never deletes, `incremental` deletes listed paths that are gone
/// from the source and does not recurse into listed directories.
pub struct LocalCopyMirror {
    source: PathBuf,
    target: PathBuf,
    pub incremental_calls: Mutex<Vec<Vec<String>>>,
}

impl LocalCopyMirror {
    pub fn new(source: &Path, target: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            incremental_calls: Mutex::new(Vec::new()),
        }
    }

    fn stale_paths(&self) -> io::Result<Vec<String>> {
        let mut stale = Vec::new();
        for relative in walk(&self.target)? {
            if !self.source.join(&relative).exists() {
                stale.push(relative);
            }
        }
        Ok(stale)
    }
}

impl Mirror for LocalCopyMirror {
    fn name(&self) -> &'static str {
        "local-copy"
    }

    fn full(&self, _cancel: &CancelToken) -> MirrorwatchResult<MirrorStatus> {
        for relative in walk(&self.source)? {
            copy_entry(&self.source.join(&relative), &self.target.join(&relative))?;
        }
        Ok(MirrorStatus::Exited(0))
    }

    fn preview_deletions(&self) -> MirrorwatchResult<(MirrorStatus, Vec<String>)> {
        Ok((MirrorStatus::Exited(0), self.stale_paths()?))
    }

    fn apply_deletions(&self) -> MirrorwatchResult<MirrorStatus> {
        for relative in self.stale_paths()? {
            remove_entry(&self.target.join(&relative))?;
        }
        Ok(MirrorStatus::Exited(0))
    }

    fn incremental(
        &self,
        paths: &[String],
        _cancel: &CancelToken,
    ) -> MirrorwatchResult<MirrorStatus> {
        self.incremental_calls.lock().unwrap().push(paths.to_vec());
        for relative in paths {
            if relative == "." {
                continue;
            }
            let from = self.source.join(relative);
            let to = self.target.join(relative);
            if from.exists() {
                copy_entry(&from, &to)?;
            } else {
                remove_entry(&to)?;
            }
        }
        Ok(MirrorStatus::Exited(0))
    }
}

/// Fails every call with the given rsync-style exit code.
pub struct FailingMirror(pub i32);

impl Mirror for FailingMirror {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn full(&self, _cancel: &CancelToken) -> MirrorwatchResult<MirrorStatus> {
        Ok(MirrorStatus::Exited(self.0))
    }

    fn preview_deletions(&self) -> MirrorwatchResult<(MirrorStatus, Vec<String>)> {
        Ok((MirrorStatus::Exited(self.0), Vec::new()))
    }

    fn apply_deletions(&self) -> MirrorwatchResult<MirrorStatus> {
        Ok(MirrorStatus::Exited(self.0))
    }

    fn incremental(
        &self,
        _paths: &[String],
        _cancel: &CancelToken,
    ) -> MirrorwatchResult<MirrorStatus> {
        Ok(MirrorStatus::Exited(self.0))
    }
}

/// Relative paths under `root`, parents before children, sorted.
pub fn walk(root: &Path) -> io::Result<Vec<String>> {
    let mut out = Vec::new();
    walk_into(root, root, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk_into(root: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let relative = path
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
            .to_string_lossy()
            .to_string();
        out.push(relative);
        if path.is_dir() {
            walk_into(root, &path, out)?;
        }
    }
    Ok(())
}

fn copy_entry(from: &Path, to: &Path) -> io::Result<()> {
    if from.is_dir() {
        return fs::create_dir_all(to);
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to).map(|_| ())
}

fn remove_entry(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
