//! mirrorwatch CLI
//!
//! Usage: mirrorwatch [OPTIONS] <SOURCE> <TARGET>

mod cli;

use std::fs;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::Cli;
use mirrorwatch::config;
use mirrorwatch::daemon::{self, DaemonOptions, Outcome};
use mirrorwatch::{CancelToken, MirrorwatchError};

/// Exit status after Ctrl+C or SIGTERM (128 + SIGINT)
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version are not failures
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    init_tracing(&cli);

    let code = match run(cli) {
        Ok(Outcome::Quit) => 0,
        Ok(Outcome::Interrupted) => EXIT_INTERRUPTED,
        Err(err) => {
            eprintln!("mirrorwatch: {:#}", err);
            err.downcast_ref::<MirrorwatchError>()
                .map_or(1, MirrorwatchError::exit_code)
        }
    };
    process::exit(code);
}

/// Logs go to stderr so stdout stays clean for `--json`. `RUST_LOG`
/// overrides `-v`.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("mirrorwatch: failed to initialise logging");
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let (mut config, warnings) = config::load_or_default(cli.config.as_deref())?;
    for warning in &warnings {
        warn!("{}", warning);
    }
    cli.apply_overrides(&mut config);

    let scratch = daemon::scratch_dir()?;
    let scratch_path = scratch.path().to_path_buf();

    // First signal (SIGINT, SIGTERM, SIGHUP) stops gracefully, a second one
    // exits at once.
    let stop = CancelToken::new();
    let handler_token = stop.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            // process::exit skips the TempDir destructor
            let _ = fs::remove_dir_all(&scratch_path);
            process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("\nShutting down (press Ctrl+C again to force)...");
        handler_token.cancel();
    })
    .context("failed to install signal handler")?;

    let options = DaemonOptions {
        source: cli.source,
        target: cli.target,
        config,
        json: cli.json,
        assume_yes: cli.yes,
    };

    let outcome = daemon::run(&options, scratch.path(), &stop);
    drop(scratch);
    Ok(outcome?)
}
