mod cache;
mod changes;
mod cli;
mod config;
mod diff;
mod dups;
mod error;
mod exec;
mod filter;
mod git;
mod ownership;
mod pipeline;
mod progress;
mod report_helpers;
mod timeseries;
mod util;

#[cfg(test)]
mod testrepo;

use std::fs::File;
use std::io::IsTerminal;
use std::sync::Mutex;

use clap::{CommandFactory, Parser};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use cli::{Cli, Commands, CommonArgs};
use config::{ConfigFile, Session, Settings};
use error::Result;

fn main() {
    let cli = Cli::parse();
    let code = match dispatch(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            err.exit_code()
        }
    };
    std::process::exit(code);
}

fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Changes {
            common,
            since,
            until,
        } => changes::run(&open(&common, None)?, &since, &until),
        Commands::ChangesTimeseries {
            common,
            since,
            until,
            period,
        } => timeseries::run_changes(&open(&common, None)?, &since, &until, &period),
        Commands::Ownership {
            common,
            when,
            min_dup_lines,
        } => ownership::run(&open(&common, min_dup_lines)?, &when),
        Commands::OwnershipTimeseries {
            common,
            since,
            until,
            period,
            min_dup_lines,
        } => timeseries::run_ownership(&open(&common, min_dup_lines)?, &since, &until, &period),
        Commands::Duplicates {
            common,
            when,
            min_dup_lines,
        } => ownership::run_duplicates(&open(&common, min_dup_lines)?, &when),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "gitwho", &mut std::io::stdout());
            Ok(0)
        }
    }
}

/// Install logging, resolve settings and open the repository.
fn open(common: &CommonArgs, min_dup_lines: Option<usize>) -> Result<Session> {
    init_tracing(common)?;
    let settings: Settings = ConfigFile::load(common.config.as_deref(), &common.repo)?
        .merge(common.overrides(min_dup_lines))
        .into();
    tracing::debug!(?settings, "resolved settings");
    let show_progress = common.verbose || std::io::stderr().is_terminal();
    Session::new(&common.repo, settings, common.format, show_progress)
}

/// Log to stderr, filtered by `RUST_LOG` or the verbosity flag. With
/// `--profile-file`, span close events with their timings also go there.
fn init_tracing(common: &CommonArgs) -> Result<()> {
    let default_level = if common.verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let profile = match &common.profile_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .with(profile)
        .init();
    Ok(())
}
