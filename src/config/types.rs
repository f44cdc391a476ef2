//! Configuration type definitions

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::watcher::Backend;

/// Sync engine timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay before each pass rotates the ledger, batching bursts of events
    #[serde(default = "default_coalesce_ms")]
    pub coalesce_ms: u64,

    /// Wait between attempts of a failed incremental pass
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl SyncConfig {
    pub fn coalesce_delay(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            coalesce_ms: default_coalesce_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_coalesce_ms() -> u64 {
    100
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

/// rsync invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsyncConfig {
    #[serde(default = "default_program")]
    pub program: String,

    /// Passed as `-e` (e.g. "ssh -p 2222")
    #[serde(default)]
    pub remote_shell: Option<String>,

    /// Appended to every invocation, before source and target
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for RsyncConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            remote_shell: None,
            extra_args: Vec::new(),
        }
    }
}

fn default_program() -> String {
    "rsync".to_string()
}

/// Change notification source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default)]
    pub backend: Backend,
}

/// Periodic full resync that repairs drift from missed events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub rsync: RsyncConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub drift: DriftConfig,
}
