//! `score` command: run one recompute cycle.

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use clap::Parser;
use foura_scorer::{DEFAULT_WINDOW, FourAScoringService, HotSincePolicy, RunSummary, ScoringConfig};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::database::DatabaseTarget;
use crate::{
    ARG_DATABASE, ARG_HOT_SINCE, ARG_TABLE_PREFIX, ARG_WINDOW_SECONDS, CliError,
    ENV_SCORE_DATABASE, write_json,
};

/// CLI arguments for the `score` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Recompute today's person and company scores for every \
                 actor and company with an event ingested inside the \
                 trailing window, then print the run summary as JSON. \
                 Intended to be triggered by cron; reruns on the same day \
                 overwrite the same rows.",
    about = "Run the 4A scoring engine"
)]
#[ortho_config(prefix = "FOURA")]
pub(crate) struct ScoreArgs {
    /// Path to the SQLite database file.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Prefix prepended to every table name (e.g. "wp_").
    #[arg(long = ARG_TABLE_PREFIX, value_name = "prefix")]
    #[serde(default)]
    pub(crate) table_prefix: Option<String>,
    /// Candidate window in seconds (default 7200).
    #[arg(long = ARG_WINDOW_SECONDS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) window_seconds: Option<u64>,
    /// How hot_since behaves across consecutive hot days.
    #[arg(long = ARG_HOT_SINCE, value_name = "carry-forward|restamp")]
    #[serde(default)]
    pub(crate) hot_since: Option<HotSincePolicy>,
}

impl ScoreArgs {
    pub(crate) fn into_config(self) -> Result<ScoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ScoreConfig::try_from(merged)
    }
}

/// Resolved `score` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreConfig {
    pub(crate) target: DatabaseTarget,
    pub(crate) window: Duration,
    pub(crate) hot_since: HotSincePolicy,
}

impl TryFrom<ScoreArgs> for ScoreConfig {
    type Error = CliError;

    fn try_from(args: ScoreArgs) -> Result<Self, Self::Error> {
        let target = DatabaseTarget::resolve(args.database, args.table_prefix, ENV_SCORE_DATABASE)?;
        Ok(Self {
            target,
            window: args.window_seconds.map_or(DEFAULT_WINDOW, Duration::from_secs),
            hot_since: args.hot_since.unwrap_or_default(),
        })
    }
}

pub(crate) fn run_score_with(
    args: ScoreArgs,
    now: DateTime<Utc>,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let summary = execute_score(&config, now)?;
    write_json(writer, &summary)
}

pub(crate) fn execute_score(config: &ScoreConfig, now: DateTime<Utc>) -> Result<RunSummary, CliError> {
    let store = config.target.open()?;
    let scoring = ScoringConfig {
        hot_since: config.hot_since,
        ..ScoringConfig::default()
    };
    let service = FourAScoringService::with_config(store, scoring)?;
    Ok(service.run_at(now, config.window)?)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ScoreConfig, CliError> {
    let merged = ScoreArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ScoreConfig::try_from(merged)
}
