//! Database target shared by every subcommand.

use camino::Utf8PathBuf;
use foura_core::store::SqliteStore;

use crate::{ARG_DATABASE, CliError};

/// Resolved database path and table prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DatabaseTarget {
    /// Path to the SQLite file.
    pub(crate) path: Utf8PathBuf,
    /// Prefix prepended to every table name; empty for bare `cp_*` tables.
    pub(crate) table_prefix: String,
}

impl DatabaseTarget {
    /// Build a target from merged options, reporting `env` when the database
    /// path is missing.
    pub(crate) fn resolve(
        database: Option<Utf8PathBuf>,
        table_prefix: Option<String>,
        env: &'static str,
    ) -> Result<Self, CliError> {
        let path = database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env,
        })?;
        Ok(Self {
            path,
            table_prefix: table_prefix.unwrap_or_default(),
        })
    }

    pub(crate) fn open(&self) -> Result<SqliteStore, CliError> {
        SqliteStore::open(self.path.as_std_path(), &self.table_prefix).map_err(|source| {
            CliError::OpenStore {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Open the database and make sure the schema exists.
    pub(crate) fn open_initialised(&self) -> Result<SqliteStore, CliError> {
        let mut store = self.open()?;
        store
            .initialise_schema()
            .map_err(|source| CliError::InitialiseSchema {
                path: self.path.clone(),
                source,
            })?;
        Ok(store)
    }
}
