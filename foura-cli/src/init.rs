//! `init` command: create or verify the schema.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::database::DatabaseTarget;
use crate::{ARG_DATABASE, ARG_TABLE_PREFIX, CliError, ENV_INIT_DATABASE};

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Create the events, weights, topic interest and score tables \
                 if they do not exist yet. Existing unprefixed tables are \
                 reused when a prefix is configured. Running init against an \
                 initialised database is a no-op.",
    about = "Create the 4A schema"
)]
#[ortho_config(prefix = "FOURA")]
pub(crate) struct InitArgs {
    /// Path to the SQLite database file.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Prefix prepended to every table name (e.g. "wp_").
    #[arg(long = ARG_TABLE_PREFIX, value_name = "prefix")]
    #[serde(default)]
    pub(crate) table_prefix: Option<String>,
}

impl InitArgs {
    pub(crate) fn into_config(self) -> Result<DatabaseTarget, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DatabaseTarget::try_from(merged)
    }
}

impl TryFrom<InitArgs> for DatabaseTarget {
    type Error = CliError;

    fn try_from(args: InitArgs) -> Result<Self, Self::Error> {
        Self::resolve(args.database, args.table_prefix, ENV_INIT_DATABASE)
    }
}

pub(crate) fn run_init(args: InitArgs) -> Result<(), CliError> {
    let target = args.into_config()?;
    initialise(&target)
}

pub(crate) fn initialise(target: &DatabaseTarget) -> Result<(), CliError> {
    let store = target.open_initialised()?;
    let tables = store.tables();
    info!(
        "4A schema ready in {} (events: {}, weights: {}, person scores: {}, company scores: {})",
        target.path, tables.events, tables.weights, tables.person_scores, tables.company_scores
    );
    Ok(())
}
