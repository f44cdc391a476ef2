//! Configuration module for mirrorwatch
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (MIRRORWATCH_*)
//! 3. `--config <file>`, or the user config (~/.config/mirrorwatch/config.toml)
//! 4. Built-in defaults (lowest priority)

mod loader;
mod types;

pub use loader::{load_or_default, user_config_path, with_env_overrides, ConfigWarning};
pub use types::{Config, DriftConfig, RsyncConfig, SyncConfig, WatcherConfig};
