use std::path::PathBuf;

use clap::Parser;
use mirrorwatch::{Backend, Config};

const EXIT_CODES: &str = "\
Exit codes:
  0    quit at the delete confirmation
  1    bad arguments, source is not a directory, or invalid config
  2    initial sync failed
  3    change notification source terminated
  130  interrupted (Ctrl+C)";

/// mirrorwatch - keep a target directory in step with a source using rsync
#[derive(Parser, Debug)]
#[command(name = "mirrorwatch")]
#[command(author, version, about, long_about = None)]
#[command(after_help = EXIT_CODES)]
pub struct Cli {
    /// Local directory to watch
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination: local path or [user@]host:path
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Config file (defaults to the user config if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output lifecycle events as NDJSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Delete target paths missing from the source without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Change notification backend
    #[arg(long, value_enum)]
    pub watcher: Option<Backend>,

    /// Skip the full rsync that runs whenever the engine goes idle
    #[arg(long)]
    pub no_drift_check: bool,

    /// Milliseconds to batch events before each pass
    #[arg(long, value_name = "MS")]
    pub coalesce_ms: Option<u64>,
}

impl Cli {
    /// Command-line flags win over the config file and environment.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(backend) = self.watcher {
            config.watcher.backend = backend;
        }
        if self.no_drift_check {
            config.drift.enabled = false;
        }
        if let Some(ms) = self.coalesce_ms {
            config.sync.coalesce_ms = ms;
        }
    }

    /// Default `tracing` filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
