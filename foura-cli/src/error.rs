//! Error types emitted by the `foura` CLI.
//!
//! Messages stay short; `main` appends the `source` chain when printing so
//! the operator sees a single line with every cause.

use std::sync::Arc;

use camino::Utf8PathBuf;
use foura_core::store::SqliteStoreError;
use foura_core::{StoreError, WeightTableError};
use foura_scorer::ScoringError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Errors emitted by the `foura` CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without the leading dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// `import` was invoked without any input file.
    #[error("nothing to import (pass --events and/or --weights)")]
    MissingImportInput,
    /// Installing the log subscriber failed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// Opening the database failed.
    #[error("failed to open database {path:?}")]
    OpenStore {
        /// Database or input path involved.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: SqliteStoreError,
    },
    /// Creating or checking the schema failed.
    #[error("failed to initialise schema in {path:?}")]
    InitialiseSchema {
        /// Database or input path involved.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: SqliteStoreError,
    },
    /// Opening an import file failed.
    #[error("failed to open {field} file {path:?}")]
    OpenInput {
        /// Input kind (`events` or `weights`).
        field: &'static str,
        /// Database or input path involved.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// An import file is not a JSON array of the expected records.
    #[error("failed to parse {field} JSON at {path:?}")]
    ParseInput {
        /// Input kind (`events` or `weights`).
        field: &'static str,
        /// Database or input path involved.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// Imported weight rows would make scoring fail.
    #[error("weights in {path:?} are invalid")]
    InvalidWeights {
        /// Database or input path involved.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: WeightTableError,
    },
    /// Writing imported rows failed.
    #[error("failed to import {field} into {path:?}")]
    Import {
        /// Input kind (`events` or `weights`).
        field: &'static str,
        /// Database or input path involved.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: StoreError,
    },
    /// Beginning or committing the import transaction failed.
    #[error("import transaction failed")]
    ImportTransaction(#[from] StoreError),
    /// The scoring run failed.
    #[error("scoring run failed")]
    Score(#[from] ScoringError),
    /// Serialising a command summary failed.
    #[error("failed to serialise command output")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write command output")]
    WriteOutput(#[source] std::io::Error),
}

impl CliError {
    /// Render the error and its causes on a single line.
    ///
    /// # Examples
    /// ```
    /// use foura_cli::CliError;
    ///
    /// let err = CliError::MissingImportInput;
    /// assert_eq!(err.one_line(), "nothing to import (pass --events and/or --weights)");
    /// ```
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut line = first_line(&self.to_string());
        let mut cause = std::error::Error::source(self);
        while let Some(inner) = cause {
            line.push_str(": ");
            line.push_str(&first_line(&inner.to_string()));
            cause = std::error::Error::source(inner);
        }
        line
    }
}

fn first_line(message: &str) -> String {
    let head = message.lines().next().unwrap_or_default();
    head.strip_prefix("error: ").unwrap_or(head).to_owned()
}
