//! Facade crate for the 4A lead-scoring engine.
//!
//! This crate re-exports the core domain types and storage traits, and
//! exposes the `SQLite` store and the scoring service behind feature flags.

#![forbid(unsafe_code)]

pub use foura_core::{
    CompanyScore, Event, EventStore, PersonScore, ScoreStore, Stage, StoreError,
    TopicInterestLookup, WeightRow, WeightSource, WeightTable, WeightTableError,
};

#[cfg(feature = "store-sqlite")]
pub use foura_core::store::{SqliteStore, SqliteStoreError, TableNames};

#[cfg(feature = "test-support")]
pub use foura_core::test_support::MemoryStore;

#[cfg(feature = "scorer")]
pub use foura_scorer::{
    DEFAULT_WINDOW, FourAScoringService, HotSincePolicy, RunSummary, ScoringConfig, ScoringError,
};
