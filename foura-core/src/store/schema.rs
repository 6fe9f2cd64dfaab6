//! SQLite schema for the 4A event, weight and score tables.
//!
//! Table names carry an optional installation prefix (for example `wp_`).
//! [`TableNames::resolve`] prefers a prefixed table, falls back to a bare one,
//! and defaults to the prefixed name when neither exists yet.

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Transaction};
use thiserror::Error;

/// Version recorded in the schema version table.
pub const SCHEMA_VERSION: i64 = 1;

const EVENTS: &str = "cp_events";
const WEIGHTS: &str = "cp_weights";
const PERSON_SCORES: &str = "cp_scores_person";
const COMPANY_SCORES: &str = "cp_scores_company";
const TOPIC_INTERESTS: &str = "cp_topic_interests";
const SCHEMA_VERSION_TABLE: &str = "cp_schema_version";

/// Physical table names resolved for one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Touchpoint events.
    pub events: String,
    /// Touchpoint weight configuration.
    pub weights: String,
    /// Daily person scores.
    pub person_scores: String,
    /// Daily company scores.
    pub company_scores: String,
    /// Declared actor topic interests.
    pub topic_interests: String,
    /// Schema version bookkeeping.
    pub schema_version: String,
}

impl TableNames {
    /// Names with the prefix applied unconditionally.
    #[must_use]
    pub fn prefixed(prefix: &str) -> Self {
        Self {
            events: format!("{prefix}{EVENTS}"),
            weights: format!("{prefix}{WEIGHTS}"),
            person_scores: format!("{prefix}{PERSON_SCORES}"),
            company_scores: format!("{prefix}{COMPANY_SCORES}"),
            topic_interests: format!("{prefix}{TOPIC_INTERESTS}"),
            schema_version: format!("{prefix}{SCHEMA_VERSION_TABLE}"),
        }
    }

    /// Inspect the database and pick the physical name of each table.
    ///
    /// # Errors
    /// Returns [`SchemaError::Lookup`] when `sqlite_master` cannot be queried.
    pub fn resolve(connection: &Connection, prefix: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            events: resolve_table(connection, prefix, EVENTS)?,
            weights: resolve_table(connection, prefix, WEIGHTS)?,
            person_scores: resolve_table(connection, prefix, PERSON_SCORES)?,
            company_scores: resolve_table(connection, prefix, COMPANY_SCORES)?,
            topic_interests: resolve_table(connection, prefix, TOPIC_INTERESTS)?,
            schema_version: resolve_table(connection, prefix, SCHEMA_VERSION_TABLE)?,
        })
    }
}

fn resolve_table(connection: &Connection, prefix: &str, base: &str) -> Result<String, SchemaError> {
    let prefixed = format!("{prefix}{base}");
    if table_exists(connection, &prefixed)? {
        return Ok(prefixed);
    }
    if !prefix.is_empty() && table_exists(connection, base)? {
        debug!("table {prefixed} not found; using existing unprefixed {base}");
        return Ok(base.to_owned());
    }
    Ok(prefixed)
}

fn table_exists(connection: &Connection, name: &str) -> Result<bool, SchemaError> {
    connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
            [name],
            |_| Ok(true),
        )
        .optional()
        .map(|found| found.unwrap_or(false))
        .map_err(|source| SchemaError::Lookup {
            table: name.to_owned(),
            source,
        })
}

/// Create every table, index and version record for the given names.
///
/// The function is idempotent. An existing installation must already be at
/// [`SCHEMA_VERSION`]; mismatches are rejected so migrations can be applied
/// explicitly.
///
/// # Errors
/// Returns [`SchemaError`] when a migration step fails or the recorded
/// version differs from [`SCHEMA_VERSION`].
pub(crate) fn initialise_schema(
    connection: &mut Connection,
    tables: &TableNames,
) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_event_tables(&transaction, tables)?;
    create_score_tables(&transaction, tables)?;
    create_indexes(&transaction, tables)?;
    ensure_schema_version(&transaction, tables)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_event_tables(transaction: &Transaction<'_>, tables: &TableNames) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create events table",
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                event_id TEXT PRIMARY KEY CHECK (length(trim(event_id)) > 0),
                occurred_at TEXT NOT NULL,
                ingested_at TEXT NOT NULL,
                actor_email TEXT,
                company_domain TEXT,
                touchpoint TEXT NOT NULL,
                stage_hint TEXT,
                depth_scroll REAL,
                depth_dwell_sec REAL,
                depth_pct_complete REAL,
                topic_tax TEXT
            )",
            tables.events
        ),
    )?;
    run_migration_step(
        transaction,
        "create weights table",
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                touchpoint TEXT PRIMARY KEY,
                base_weight REAL NOT NULL,
                stage_default TEXT NOT NULL DEFAULT 'attention',
                category TEXT NOT NULL DEFAULT 'low',
                is_active INTEGER NOT NULL DEFAULT 1
            )",
            tables.weights
        ),
    )?;
    run_migration_step(
        transaction,
        "create topic interests table",
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                actor_email TEXT PRIMARY KEY COLLATE NOCASE,
                interests TEXT
            ) WITHOUT ROWID",
            tables.topic_interests
        ),
    )
}

fn create_score_tables(transaction: &Transaction<'_>, tables: &TableNames) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create person scores table",
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                actor_email TEXT NOT NULL,
                score_date TEXT NOT NULL,
                person_score REAL NOT NULL,
                stage TEXT NOT NULL,
                last_touch TEXT,
                last_touch_at TEXT,
                mql_flag INTEGER NOT NULL DEFAULT 0,
                sql_flag INTEGER NOT NULL DEFAULT 0,
                nba_recommendation TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (actor_email, score_date)
            ) WITHOUT ROWID",
            tables.person_scores
        ),
    )?;
    run_migration_step(
        transaction,
        "create company scores table",
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                company_domain TEXT NOT NULL,
                score_date TEXT NOT NULL,
                company_score REAL NOT NULL,
                stage_mode TEXT NOT NULL,
                engaged_contacts INTEGER NOT NULL DEFAULT 0,
                hot_flag INTEGER NOT NULL DEFAULT 0,
                hot_since TEXT,
                nba_recommendation TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (company_domain, score_date)
            ) WITHOUT ROWID",
            tables.company_scores
        ),
    )
}

fn create_indexes(transaction: &Transaction<'_>, tables: &TableNames) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "index events by actor",
        &format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_actor_key
                ON {0}({1}, occurred_at)",
            tables.events,
            identity_expression("actor_email")
        ),
    )?;
    run_migration_step(
        transaction,
        "index events by company",
        &format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_company_key
                ON {0}({1}, occurred_at)",
            tables.events,
            identity_expression("company_domain")
        ),
    )?;
    run_migration_step(
        transaction,
        "index events by ingestion time",
        &format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_ingested_utc ON {0}(datetime(ingested_at))",
            tables.events
        ),
    )
}

/// SQL expression folding an identity column to its canonical key.
///
/// Mirrors [`crate::identity_key`]: whitespace is trimmed and ASCII letters
/// are lower-cased. Queries must use the same text for the expression
/// indexes to apply.
pub(crate) fn identity_expression(column: &str) -> String {
    format!("lower(trim({column}, char(32, 9, 10, 13)))")
}

fn ensure_schema_version(transaction: &Transaction<'_>, tables: &TableNames) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY CHECK (version > 0),
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%S', 'now'))
            ) WITHOUT ROWID",
            tables.schema_version
        ),
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            &format!("SELECT version FROM {} LIMIT 1", tables.schema_version),
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                &format!("INSERT INTO {} (version) VALUES (?1)", tables.schema_version),
                [SCHEMA_VERSION],
            )
            .map(|_| info!("recorded 4A schema version {SCHEMA_VERSION} in {}", tables.schema_version))
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised while resolving or initialising the schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Probing `sqlite_master` for a table failed.
    #[error("failed to look up table {table}")]
    Lookup {
        /// Table that was being looked up.
        table: String,
        /// Source error from `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A migration statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Description of the failed step.
        step: &'static str,
        /// Source error from `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The database records a different schema version.
    #[error(
        "expected 4A schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version supported by this binary.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}
