//! `import` command: load events and weight rows from JSON arrays.

use std::fs::File;
use std::io::{BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use clap::Parser;
use foura_core::{Event, WeightRow, WeightTable};
use log::{debug, info};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::database::DatabaseTarget;
use crate::{
    ARG_DATABASE, ARG_EVENTS, ARG_TABLE_PREFIX, ARG_WEIGHTS, CliError, ENV_IMPORT_DATABASE,
    write_json,
};

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Append canonical events and upsert touchpoint weights. \
                 Each input is a JSON array; events whose event_id already \
                 exists are skipped and weights replace the stored row for \
                 their touchpoint. The schema is created when missing.",
    about = "Import events and weights from JSON"
)]
#[ortho_config(prefix = "FOURA")]
pub(crate) struct ImportArgs {
    /// Path to the SQLite database file.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Prefix prepended to every table name (e.g. "wp_").
    #[arg(long = ARG_TABLE_PREFIX, value_name = "prefix")]
    #[serde(default)]
    pub(crate) table_prefix: Option<String>,
    /// JSON array of events to append.
    #[arg(long = ARG_EVENTS, value_name = "path")]
    #[serde(default)]
    pub(crate) events: Option<Utf8PathBuf>,
    /// JSON array of weight rows to upsert.
    #[arg(long = ARG_WEIGHTS, value_name = "path")]
    #[serde(default)]
    pub(crate) weights: Option<Utf8PathBuf>,
}

impl ImportArgs {
    pub(crate) fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) target: DatabaseTarget,
    pub(crate) events: Option<Utf8PathBuf>,
    pub(crate) weights: Option<Utf8PathBuf>,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let target = DatabaseTarget::resolve(args.database, args.table_prefix, ENV_IMPORT_DATABASE)?;
        if args.events.is_none() && args.weights.is_none() {
            return Err(CliError::MissingImportInput);
        }
        Ok(Self {
            target,
            events: args.events,
            weights: args.weights,
        })
    }
}

/// An event as accepted on the import surface.
///
/// `ingested_at` defaults to the moment of import so freshly loaded events
/// are picked up by the next scoring run.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EventRecord {
    event_id: String,
    occurred_at: DateTime<Utc>,
    #[serde(default)]
    ingested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    actor_email: Option<String>,
    #[serde(default)]
    company_domain: Option<String>,
    touchpoint: String,
    #[serde(default)]
    stage_hint: Option<String>,
    #[serde(default)]
    depth_scroll: Option<f64>,
    #[serde(default)]
    depth_dwell_sec: Option<f64>,
    #[serde(default)]
    depth_pct_complete: Option<f64>,
    #[serde(default)]
    topic_tax: Option<String>,
}

impl EventRecord {
    pub(crate) fn into_event(self, imported_at: DateTime<Utc>) -> Event {
        Event {
            event_id: self.event_id,
            occurred_at: self.occurred_at,
            ingested_at: self.ingested_at.unwrap_or(imported_at),
            actor_email: self.actor_email,
            company_domain: self.company_domain,
            touchpoint: self.touchpoint,
            stage_hint: self.stage_hint,
            depth_scroll: self.depth_scroll,
            depth_dwell_sec: self.depth_dwell_sec,
            depth_pct_complete: self.depth_pct_complete,
            topic_tax: self.topic_tax,
        }
    }
}

/// Rows written by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ImportSummary {
    pub(crate) events_inserted: usize,
    pub(crate) events_skipped: usize,
    pub(crate) weights_upserted: usize,
}

pub(crate) fn run_import_with(
    args: ImportArgs,
    now: DateTime<Utc>,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let summary = execute_import(&config, now)?;
    write_json(writer, &summary)
}

/// Parse every input, then write it in one transaction. Nothing is written
/// unless every input is valid and every write succeeds.
pub(crate) fn execute_import(
    config: &ImportConfig,
    now: DateTime<Utc>,
) -> Result<ImportSummary, CliError> {
    let events: Option<Vec<EventRecord>> = config
        .events
        .as_deref()
        .map(|path| load_records(path, ARG_EVENTS))
        .transpose()?;
    let weights: Option<Vec<WeightRow>> = config
        .weights
        .as_deref()
        .map(|path| load_records(path, ARG_WEIGHTS))
        .transpose()?;
    if let (Some(rows), Some(path)) = (&weights, &config.weights) {
        WeightTable::from_rows(rows.iter().cloned(), WeightRow::fallback()).map_err(
            |source| CliError::InvalidWeights {
                path: path.clone(),
                source,
            },
        )?;
    }

    let mut store = config.target.open_initialised()?;
    let summary = store.in_transaction(|batch| {
        let mut counts = ImportSummary::default();
        for row in weights.iter().flatten() {
            batch
                .upsert_weight(row)
                .map_err(|source| import_error(config, ARG_WEIGHTS, source))?;
            counts.weights_upserted += 1;
        }
        for record in events.into_iter().flatten() {
            let event = record.into_event(now);
            let inserted = batch
                .append_event(&event)
                .map_err(|source| import_error(config, ARG_EVENTS, source))?;
            if inserted {
                counts.events_inserted += 1;
            } else {
                debug!("event {} already stored; skipped", event.event_id);
                counts.events_skipped += 1;
            }
        }
        Ok::<_, CliError>(counts)
    })?;
    info!(
        "imported {} events ({} duplicates skipped) and {} weights into {}",
        summary.events_inserted, summary.events_skipped, summary.weights_upserted, config.target.path
    );
    Ok(summary)
}

fn import_error(
    config: &ImportConfig,
    field: &'static str,
    source: foura_core::StoreError,
) -> CliError {
    CliError::Import {
        field,
        path: config.target.path.clone(),
        source,
    }
}

/// Load a JSON array of records from disk.
pub(crate) fn load_records<T: DeserializeOwned>(
    path: &Utf8Path,
    field: &'static str,
) -> Result<Vec<T>, CliError> {
    let file = File::open(path).map_err(|source| CliError::OpenInput {
        field,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseInput {
        field,
        path: path.to_path_buf(),
        source,
    })
}
