//! Command-line interface for the 4A lead-scoring engine.
//!
//! `foura init` creates the schema, `foura import` loads events and weight
//! rows from JSON, and `foura score` runs one recompute cycle. Every option
//! can also come from `FOURA_*` environment variables or configuration files.
#![forbid(unsafe_code)]

use std::io::Write;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

mod database;
mod error;
mod import;
mod init;
mod score;
mod telemetry;

pub use error::CliError;
pub use telemetry::TelemetryError;

use import::{ImportArgs, run_import_with};
use init::{InitArgs, run_init};
use score::{ScoreArgs, run_score_with};

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_TABLE_PREFIX: &str = "table-prefix";
pub(crate) const ARG_EVENTS: &str = "events";
pub(crate) const ARG_WEIGHTS: &str = "weights";
pub(crate) const ARG_WINDOW_SECONDS: &str = "window-seconds";
pub(crate) const ARG_HOT_SINCE: &str = "hot-since";
pub(crate) const ENV_INIT_DATABASE: &str = "FOURA_CMDS_INIT_DATABASE";
pub(crate) const ENV_IMPORT_DATABASE: &str = "FOURA_CMDS_IMPORT_DATABASE";
pub(crate) const ENV_SCORE_DATABASE: &str = "FOURA_CMDS_SCORE_DATABASE";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments or configuration are invalid, or when
/// the selected command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    telemetry::init(telemetry::DEFAULT_LOG_FILTER)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, Utc::now(), &mut stdout)
}

fn dispatch(command: Command, now: DateTime<Utc>, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Init(args) => run_init(args),
        Command::Import(args) => run_import_with(args, now, writer),
        Command::Score(args) => run_score_with(args, now, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "foura",
    about = "Deterministic 4A lead scoring over a SQLite event log",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the 4A tables in a database.
    Init(InitArgs),
    /// Append events and upsert touchpoint weights from JSON files.
    Import(ImportArgs),
    /// Recompute scores for recently active people and companies.
    Score(ScoreArgs),
}

/// Write `value` as pretty JSON followed by a newline.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
