//! Storage traits used by the scoring engine.
//!
//! The engine never talks to a database directly. It reads events through
//! [`EventStore`], weights through [`WeightSource`], declared interests through
//! [`TopicInterestLookup`], and writes through [`ScoreStore`]. Every operation
//! reports backend failures as [`StoreError`] so the engine can abort a run
//! without knowing which technology sits underneath.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::{CompanyScore, Event, PersonScore, WeightRow};

#[cfg(feature = "store-sqlite")]
mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use schema::{SCHEMA_VERSION, SchemaError, TableNames};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreError};

/// Failure reported by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not complete an operation.
    #[error("storage backend failed to {operation}: {source}")]
    Backend {
        /// Description of the failed operation.
        operation: &'static str,
        /// Underlying backend error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A stored value could not be decoded into the domain model.
    #[error("stored {field} value {raw:?} is malformed")]
    Malformed {
        /// Column or field that failed to decode.
        field: &'static str,
        /// Raw stored value.
        raw: String,
    },
}

impl StoreError {
    /// Wrap a backend error together with the operation that failed.
    pub fn backend<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }
}

/// Read access to ingested touchpoint events.
///
/// Identity matching is case-insensitive. Returned event lists are ordered by
/// `occurred_at` ascending, then by `event_id`.
pub trait EventStore {
    /// Distinct lower-cased actor e-mails with an event ingested at or after
    /// `since`.
    fn candidate_actors(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    /// Distinct lower-cased company domains with an event ingested at or after
    /// `since`.
    fn candidate_companies(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    /// Events for an actor that occurred at or after `occurred_since`.
    fn events_for_actor(
        &self,
        email: &str,
        occurred_since: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError>;

    /// Events for a company that occurred at or after `occurred_since`.
    fn events_for_company(
        &self,
        domain: &str,
        occurred_since: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError>;
}

/// Read access to the admin-managed weight configuration.
pub trait WeightSource {
    /// Return every active weight row as configured.
    fn active_weights(&self) -> Result<Vec<WeightRow>, StoreError>;
}

/// Read access to per-actor declared topic interests.
pub trait TopicInterestLookup {
    /// Return the raw interest attribute for an actor, if one is recorded.
    ///
    /// The value may be a JSON array, a JSON object, or a comma-separated
    /// list; the scorer interprets it.
    fn raw_interests(&self, email: &str) -> Result<Option<String>, StoreError>;
}

/// Write access to the daily score tables.
pub trait ScoreStore {
    /// Insert or replace the person row keyed by `(actor_email, score_date)`.
    fn upsert_person_score(&self, score: &PersonScore) -> Result<(), StoreError>;

    /// Insert or replace the company row keyed by `(company_domain, score_date)`.
    fn upsert_company_score(&self, score: &CompanyScore) -> Result<(), StoreError>;

    /// Fetch the person row for a given day.
    fn person_score(
        &self,
        email: &str,
        score_date: NaiveDate,
    ) -> Result<Option<PersonScore>, StoreError>;

    /// Fetch the company row for a given day.
    fn company_score(
        &self,
        domain: &str,
        score_date: NaiveDate,
    ) -> Result<Option<CompanyScore>, StoreError>;

    /// Fetch the most recent company row dated on or before `on_or_before`.
    fn latest_company_score(
        &self,
        domain: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<CompanyScore>, StoreError>;
}
