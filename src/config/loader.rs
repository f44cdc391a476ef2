//! Configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MirrorwatchError, MirrorwatchResult};
use crate::watcher::Backend;

use super::types::Config;

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown config key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> MirrorwatchResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| MirrorwatchError::Config {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(&content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// User config location (`~/.config/mirrorwatch/config.toml` on Linux)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mirrorwatch").join("config.toml"))
}

/// Load the explicit config file, else the user config if present, else
/// defaults. Environment overrides are applied last.
///
/// An explicit path that does not exist is an error; a missing user config
/// is not.
pub fn load_or_default(explicit: Option<&Path>) -> MirrorwatchResult<(Config, Vec<ConfigWarning>)> {
    let (config, warnings) = match explicit {
        Some(path) => load_with_warnings(path)?,
        None => match user_config_path() {
            Some(path) if path.is_file() => load_with_warnings(&path)?,
            _ => (Config::default(), Vec::new()),
        },
    };

    Ok((with_env_overrides(config)?, warnings))
}

/// Apply environment variable overrides (MIRRORWATCH_* prefix)
pub fn with_env_overrides(config: Config) -> MirrorwatchResult<Config> {
    with_overrides_from(config, |key| std::env::var(key).ok())
}

pub(crate) fn with_overrides_from(
    mut config: Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> MirrorwatchResult<Config> {
    // MIRRORWATCH_RSYNC
    if let Some(program) = lookup("MIRRORWATCH_RSYNC") {
        if !program.trim().is_empty() {
            config.rsync.program = program;
        }
    }

    // MIRRORWATCH_WATCHER
    if let Some(backend) = lookup("MIRRORWATCH_WATCHER") {
        config.watcher.backend = match backend.to_lowercase().as_str() {
            "notify" => Backend::Notify,
            "inotifywait" => Backend::Inotifywait,
            other => {
                return Err(MirrorwatchError::Usage {
                    message: format!(
                        "MIRRORWATCH_WATCHER must be 'notify' or 'inotifywait', got '{}'",
                        other
                    ),
                })
            }
        };
    }

    // MIRRORWATCH_COALESCE_MS
    if let Some(ms) = lookup("MIRRORWATCH_COALESCE_MS") {
        config.sync.coalesce_ms = parse_millis("MIRRORWATCH_COALESCE_MS", &ms)?;
    }

    // MIRRORWATCH_RETRY_BACKOFF_MS
    if let Some(ms) = lookup("MIRRORWATCH_RETRY_BACKOFF_MS") {
        config.sync.retry_backoff_ms = parse_millis("MIRRORWATCH_RETRY_BACKOFF_MS", &ms)?;
    }

    // MIRRORWATCH_DRIFT
    if let Some(val) = lookup("MIRRORWATCH_DRIFT") {
        config.drift.enabled = val.to_lowercase() != "false" && val != "0";
    }

    Ok(config)
}

fn parse_millis(var: &str, value: &str) -> MirrorwatchResult<u64> {
    value.trim().parse().map_err(|_| MirrorwatchError::Usage {
        message: format!("{} must be a whole number of milliseconds, got '{}'", var, value),
    })
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "sync",
        "coalesce_ms",
        "retry_backoff_ms",
        "rsync",
        "program",
        "remote_shell",
        "extra_args",
        "watcher",
        "backend",
        "drift",
        "enabled",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
