//! `SQLite` implementation of the storage traits.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

use super::schema::{SchemaError, TableNames, identity_expression, initialise_schema};
use super::{EventStore, ScoreStore, StoreError, TopicInterestLookup, WeightSource};
use crate::{CompanyScore, Event, PersonScore, Stage, WeightRow, identity_key};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const EMPTY_RECOMMENDATION: &str = "[]";

// Depth columns are cast to REAL so numeric text parses and other text reads
// as zero.
const EVENT_COLUMNS: &str = "event_id, occurred_at, ingested_at, actor_email, company_domain, \
    touchpoint, stage_hint, CAST(depth_scroll AS REAL), CAST(depth_dwell_sec AS REAL), \
    CAST(depth_pct_complete AS REAL), topic_tax";

/// Errors raised while opening or initialising a [`SqliteStore`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// The database file could not be opened.
    #[error("failed to open 4A database at {path}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Source error from `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Resolving or creating the schema failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Scoring storage backed by a single `SQLite` database.
///
/// # Examples
/// ```
/// use foura_core::store::{ScoreStore, SqliteStore};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = SqliteStore::open_in_memory("wp_")?;
/// store.initialise_schema()?;
/// assert_eq!(store.tables().events, "wp_cp_events");
/// let day = chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap_or_default();
/// assert!(store.person_score("ada@example.com", day)?.is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    connection: Connection,
    prefix: String,
    tables: TableNames,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    ///
    /// Table names are resolved against `prefix` immediately; call
    /// [`SqliteStore::initialise_schema`] before the first write to a fresh
    /// database.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when the file cannot be opened or its tables cannot be resolved.
    pub fn open(path: impl AsRef<Path>, prefix: &str) -> Result<Self, SqliteStoreError> {
        let path_ref = path.as_ref();
        let connection = Connection::open(path_ref).map_err(|source| SqliteStoreError::Open {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_connection(connection, prefix)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError`] when `SQLite` cannot allocate the database.
    pub fn open_in_memory(prefix: &str) -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::Open {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection, prefix)
    }

    fn from_connection(connection: Connection, prefix: &str) -> Result<Self, SqliteStoreError> {
        let tables = TableNames::resolve(&connection, prefix)?;
        Ok(Self {
            connection,
            prefix: prefix.to_owned(),
            tables,
        })
    }

    /// Create the scoring tables and record the schema version.
    ///
    /// Table names are re-resolved afterwards so a store opened on an empty
    /// database picks up the tables it just created.
    ///
    /// # Errors
    /// Returns [`SqliteStoreError::Schema`] when a migration step fails or the
    /// database records an unsupported schema version.
    pub fn initialise_schema(&mut self) -> Result<(), SqliteStoreError> {
        initialise_schema(&mut self.connection, &self.tables)?;
        self.tables = TableNames::resolve(&self.connection, &self.prefix)?;
        Ok(())
    }

    /// Physical table names in use.
    #[must_use]
    pub const fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Run `body` inside one transaction.
    ///
    /// The transaction commits when `body` returns `Ok` and rolls back when it
    /// returns `Err`, so a failed batch of appends and upserts leaves the
    /// database untouched.
    ///
    /// # Errors
    /// Returns the error from `body`, or a [`StoreError`] converted into `E`
    /// when the transaction cannot begin or commit.
    pub fn in_transaction<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let transaction = self
            .connection
            .unchecked_transaction()
            .map_err(|source| StoreError::backend("begin transaction", source))?;
        let value = body(self)?;
        transaction
            .commit()
            .map_err(|source| StoreError::backend("commit transaction", source))?;
        Ok(value)
    }

    /// Append an event record. Returns `false` when the `event_id` already
    /// exists; stored events are never modified.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the insert fails.
    pub fn append_event(&self, event: &Event) -> Result<bool, StoreError> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (
                event_id, occurred_at, ingested_at, actor_email, company_domain, touchpoint,
                stage_hint, depth_scroll, depth_dwell_sec, depth_pct_complete, topic_tax
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            self.tables.events
        );
        let inserted = self
            .connection
            .prepare_cached(&sql)
            .and_then(|mut statement| {
                statement.execute(params![
                    event.event_id,
                    format_timestamp(event.occurred_at),
                    format_timestamp(event.ingested_at),
                    event.actor_email,
                    event.company_domain,
                    event.touchpoint,
                    event.stage_hint,
                    event.depth_scroll,
                    event.depth_dwell_sec,
                    event.depth_pct_complete,
                    event.topic_tax,
                ])
            })
            .map_err(|source| StoreError::backend("append event", source))?;
        Ok(inserted > 0)
    }

    /// Insert or replace the configuration for a touchpoint.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the upsert fails.
    pub fn upsert_weight(&self, row: &WeightRow) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (touchpoint, base_weight, stage_default, category, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(touchpoint) DO UPDATE SET
                base_weight = excluded.base_weight,
                stage_default = excluded.stage_default,
                category = excluded.category,
                is_active = excluded.is_active",
            self.tables.weights
        );
        self.connection
            .execute(
                &sql,
                params![
                    row.touchpoint,
                    row.base_weight,
                    row.stage_default.as_str(),
                    row.category,
                    row.is_active,
                ],
            )
            .map(|_| ())
            .map_err(|source| StoreError::backend("upsert weight", source))
    }

    /// Record the raw topic-interest attribute for an actor.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the upsert fails.
    pub fn set_topic_interests(&self, email: &str, interests: &str) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (actor_email, interests) VALUES (?1, ?2)
             ON CONFLICT(actor_email) DO UPDATE SET interests = excluded.interests",
            self.tables.topic_interests
        );
        self.connection
            .execute(&sql, params![identity_key(email), interests])
            .map(|_| ())
            .map_err(|source| StoreError::backend("set topic interests", source))
    }

    fn candidates(
        &self,
        column: &'static str,
        since: DateTime<Utc>,
        operation: &'static str,
    ) -> Result<Vec<String>, StoreError> {
        let key = identity_expression(column);
        let sql = format!(
            "SELECT DISTINCT {key} AS candidate FROM {}
             WHERE datetime(ingested_at) >= datetime(?1) AND {key} <> ''
             ORDER BY candidate",
            self.tables.events
        );
        let mut statement = self
            .connection
            .prepare_cached(&sql)
            .map_err(|source| StoreError::backend(operation, source))?;
        let rows = statement
            .query_map([format_timestamp(since)], |row| row.get::<_, String>(0))
            .map_err(|source| StoreError::backend(operation, source))?;
        rows.map(|row| row.map_err(|source| StoreError::backend(operation, source)))
            .collect()
    }

    fn events_matching(
        &self,
        column: &'static str,
        key: &str,
        occurred_since: DateTime<Utc>,
        operation: &'static str,
    ) -> Result<Vec<Event>, StoreError> {
        let wanted = identity_key(key);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM {}
             WHERE {} = ?1 AND datetime(occurred_at) >= datetime(?2)
             ORDER BY datetime(occurred_at), event_id",
            self.tables.events,
            identity_expression(column)
        );
        let mut statement = self
            .connection
            .prepare_cached(&sql)
            .map_err(|source| StoreError::backend(operation, source))?;
        let rows = statement
            .query_map(
                params![wanted, format_timestamp(occurred_since)],
                StoredEvent::from_row,
            )
            .map_err(|source| StoreError::backend(operation, source))?;
        rows.map(|row| {
            row.map_err(|source| StoreError::backend(operation, source))
                .and_then(StoredEvent::into_event)
        })
        .collect()
    }

    fn query_company_score(
        &self,
        sql: &str,
        domain: &str,
        score_date: NaiveDate,
        operation: &'static str,
    ) -> Result<Option<CompanyScore>, StoreError> {
        self.connection
            .query_row(
                sql,
                params![identity_key(domain), format_date(score_date)],
                StoredCompanyScore::from_row,
            )
            .optional()
            .map_err(|source| StoreError::backend(operation, source))?
            .map(StoredCompanyScore::into_score)
            .transpose()
    }
}

impl EventStore for SqliteStore {
    fn candidate_actors(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        self.candidates("actor_email", since, "select candidate actors")
    }

    fn candidate_companies(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        self.candidates("company_domain", since, "select candidate companies")
    }

    fn events_for_actor(
        &self,
        email: &str,
        occurred_since: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        self.events_matching("actor_email", email, occurred_since, "load actor events")
    }

    fn events_for_company(
        &self,
        domain: &str,
        occurred_since: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        self.events_matching(
            "company_domain",
            domain,
            occurred_since,
            "load company events",
        )
    }
}

impl WeightSource for SqliteStore {
    fn active_weights(&self) -> Result<Vec<WeightRow>, StoreError> {
        let sql = format!(
            "SELECT touchpoint, CAST(base_weight AS REAL), stage_default, category
             FROM {} WHERE is_active = 1 ORDER BY rowid",
            self.tables.weights
        );
        let mut statement = self
            .connection
            .prepare_cached(&sql)
            .map_err(|source| StoreError::backend("prepare weight query", source))?;
        let rows = statement
            .query_map([], |row| {
                let stage: Option<String> = row.get(2)?;
                let category: Option<String> = row.get(3)?;
                Ok(WeightRow::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<f64>>(1)?.unwrap_or_default(),
                    Stage::from_label(stage.as_deref().unwrap_or_default()),
                    category.unwrap_or_default(),
                ))
            })
            .map_err(|source| StoreError::backend("load weights", source))?;
        rows.map(|row| row.map_err(|source| StoreError::backend("load weights", source)))
            .collect()
    }
}

impl TopicInterestLookup for SqliteStore {
    fn raw_interests(&self, email: &str) -> Result<Option<String>, StoreError> {
        let sql = format!(
            "SELECT interests FROM {} WHERE actor_email = ?1 COLLATE NOCASE LIMIT 1",
            self.tables.topic_interests
        );
        self.connection
            .query_row(&sql, [identity_key(email)], |row| row.get::<_, Option<String>>(0))
            .optional()
            .map(Option::flatten)
            .map_err(|source| StoreError::backend("load topic interests", source))
    }
}

impl ScoreStore for SqliteStore {
    fn upsert_person_score(&self, score: &PersonScore) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (
                actor_email, score_date, person_score, stage, last_touch, last_touch_at,
                mql_flag, sql_flag, nba_recommendation, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            ON CONFLICT(actor_email, score_date) DO UPDATE SET
                person_score = excluded.person_score,
                stage = excluded.stage,
                last_touch = excluded.last_touch,
                last_touch_at = excluded.last_touch_at,
                mql_flag = excluded.mql_flag,
                sql_flag = excluded.sql_flag,
                nba_recommendation = excluded.nba_recommendation,
                updated_at = excluded.updated_at",
            self.tables.person_scores
        );
        self.connection
            .execute(
                &sql,
                params![
                    score.actor_email,
                    format_date(score.score_date),
                    score.person_score,
                    score.stage.as_str(),
                    score.last_touch,
                    score.last_touch_at.map(format_timestamp),
                    score.mql_flag,
                    score.sql_flag,
                    EMPTY_RECOMMENDATION,
                    format_timestamp(Utc::now()),
                ],
            )
            .map(|_| ())
            .map_err(|source| StoreError::backend("upsert person score", source))
    }

    fn upsert_company_score(&self, score: &CompanyScore) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (
                company_domain, score_date, company_score, stage_mode, engaged_contacts,
                hot_flag, hot_since, nba_recommendation, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ON CONFLICT(company_domain, score_date) DO UPDATE SET
                company_score = excluded.company_score,
                stage_mode = excluded.stage_mode,
                engaged_contacts = excluded.engaged_contacts,
                hot_flag = excluded.hot_flag,
                hot_since = excluded.hot_since,
                nba_recommendation = excluded.nba_recommendation,
                updated_at = excluded.updated_at",
            self.tables.company_scores
        );
        self.connection
            .execute(
                &sql,
                params![
                    score.company_domain,
                    format_date(score.score_date),
                    score.company_score,
                    score.stage_mode.as_str(),
                    score.engaged_contacts,
                    score.hot_flag,
                    score.hot_since.map(format_date),
                    EMPTY_RECOMMENDATION,
                    format_timestamp(Utc::now()),
                ],
            )
            .map(|_| ())
            .map_err(|source| StoreError::backend("upsert company score", source))
    }

    fn person_score(
        &self,
        email: &str,
        score_date: NaiveDate,
    ) -> Result<Option<PersonScore>, StoreError> {
        let sql = format!(
            "SELECT actor_email, score_date, person_score, stage, last_touch, last_touch_at,
                    mql_flag, sql_flag
             FROM {} WHERE actor_email = ?1 COLLATE NOCASE AND score_date = ?2 LIMIT 1",
            self.tables.person_scores
        );
        self.connection
            .query_row(
                &sql,
                params![identity_key(email), format_date(score_date)],
                StoredPersonScore::from_row,
            )
            .optional()
            .map_err(|source| StoreError::backend("load person score", source))?
            .map(StoredPersonScore::into_score)
            .transpose()
    }

    fn company_score(
        &self,
        domain: &str,
        score_date: NaiveDate,
    ) -> Result<Option<CompanyScore>, StoreError> {
        let sql = format!(
            "SELECT {COMPANY_COLUMNS} FROM {}
             WHERE company_domain = ?1 COLLATE NOCASE AND score_date = ?2 LIMIT 1",
            self.tables.company_scores
        );
        self.query_company_score(&sql, domain, score_date, "load company score")
    }

    fn latest_company_score(
        &self,
        domain: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<CompanyScore>, StoreError> {
        let sql = format!(
            "SELECT {COMPANY_COLUMNS} FROM {}
             WHERE company_domain = ?1 COLLATE NOCASE AND score_date <= ?2
             ORDER BY score_date DESC LIMIT 1",
            self.tables.company_scores
        );
        self.query_company_score(&sql, domain, on_or_before, "load latest company score")
    }
}

const COMPANY_COLUMNS: &str =
    "company_domain, score_date, company_score, stage_mode, engaged_contacts, hot_flag, hot_since";

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn format_date(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

fn parse_timestamp(field: &'static str, raw: String) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw.trim()).map(|at| at.with_timezone(&Utc)))
        .map_err(|_| StoreError::Malformed { field, raw })
}

fn parse_date(field: &'static str, raw: String) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| StoreError::Malformed { field, raw })
}

fn parse_optional_timestamp(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| parse_timestamp(field, value))
        .transpose()
}

fn parse_optional_date(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<NaiveDate>, StoreError> {
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| parse_date(field, value))
        .transpose()
}

struct StoredEvent {
    event_id: String,
    occurred_at: String,
    ingested_at: String,
    actor_email: Option<String>,
    company_domain: Option<String>,
    touchpoint: String,
    stage_hint: Option<String>,
    depth_scroll: Option<f64>,
    depth_dwell_sec: Option<f64>,
    depth_pct_complete: Option<f64>,
    topic_tax: Option<String>,
}

impl StoredEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            event_id: row.get(0)?,
            occurred_at: row.get(1)?,
            ingested_at: row.get(2)?,
            actor_email: row.get(3)?,
            company_domain: row.get(4)?,
            touchpoint: row.get(5)?,
            stage_hint: row.get(6)?,
            depth_scroll: row.get(7)?,
            depth_dwell_sec: row.get(8)?,
            depth_pct_complete: row.get(9)?,
            topic_tax: row.get(10)?,
        })
    }

    fn into_event(self) -> Result<Event, StoreError> {
        Ok(Event {
            event_id: self.event_id,
            occurred_at: parse_timestamp("occurred_at", self.occurred_at)?,
            ingested_at: parse_timestamp("ingested_at", self.ingested_at)?,
            actor_email: self.actor_email,
            company_domain: self.company_domain,
            touchpoint: self.touchpoint,
            stage_hint: self.stage_hint,
            depth_scroll: self.depth_scroll,
            depth_dwell_sec: self.depth_dwell_sec,
            depth_pct_complete: self.depth_pct_complete,
            topic_tax: self.topic_tax,
        })
    }
}

struct StoredPersonScore {
    actor_email: String,
    score_date: String,
    person_score: f64,
    stage: String,
    last_touch: Option<String>,
    last_touch_at: Option<String>,
    mql_flag: bool,
    sql_flag: bool,
}

impl StoredPersonScore {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            actor_email: row.get(0)?,
            score_date: row.get(1)?,
            person_score: row.get(2)?,
            stage: row.get(3)?,
            last_touch: row.get(4)?,
            last_touch_at: row.get(5)?,
            mql_flag: row.get(6)?,
            sql_flag: row.get(7)?,
        })
    }

    fn into_score(self) -> Result<PersonScore, StoreError> {
        Ok(PersonScore {
            actor_email: self.actor_email,
            score_date: parse_date("score_date", self.score_date)?,
            person_score: self.person_score,
            stage: Stage::from_label(&self.stage),
            last_touch: self.last_touch,
            last_touch_at: parse_optional_timestamp("last_touch_at", self.last_touch_at)?,
            mql_flag: self.mql_flag,
            sql_flag: self.sql_flag,
        })
    }
}

struct StoredCompanyScore {
    company_domain: String,
    score_date: String,
    company_score: f64,
    stage_mode: String,
    engaged_contacts: u32,
    hot_flag: bool,
    hot_since: Option<String>,
}

impl StoredCompanyScore {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            company_domain: row.get(0)?,
            score_date: row.get(1)?,
            company_score: row.get(2)?,
            stage_mode: row.get(3)?,
            engaged_contacts: row.get(4)?,
            hot_flag: row.get(5)?,
            hot_since: row.get(6)?,
        })
    }

    fn into_score(self) -> Result<CompanyScore, StoreError> {
        Ok(CompanyScore {
            company_domain: self.company_domain,
            score_date: parse_date("score_date", self.score_date)?,
            company_score: self.company_score,
            stage_mode: Stage::from_label(&self.stage_mode),
            engaged_contacts: self.engaged_contacts,
            hot_flag: self.hot_flag,
            hot_since: parse_optional_date("hot_since", self.hot_since)?,
        })
    }
}
