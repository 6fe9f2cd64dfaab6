//! Core domain types for the 4A lead-scoring engine.
//!
//! The crate defines the canonical touchpoint [`Event`], the weight
//! configuration ([`WeightRow`], [`WeightTable`]), funnel [`Stage`]s and the
//! daily [`PersonScore`] and [`CompanyScore`] rows, together with the storage
//! traits the scorer reads and writes through. A `SQLite` backend is available
//! behind the `store-sqlite` feature and an in-memory backend behind
//! `test-support`.
#![forbid(unsafe_code)]

mod event;
mod score;
mod stage;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
mod weights;

pub use event::{Event, identity_key};
pub use score::{CompanyScore, PersonScore, round_score};
pub use stage::Stage;
pub use store::{EventStore, ScoreStore, StoreError, TopicInterestLookup, WeightSource};
pub use weights::{
    FALLBACK_BASE_WEIGHT, FALLBACK_CATEGORY, POSITIVE_CATEGORY, WeightRow, WeightTable,
    WeightTableError, touchpoint_key,
};
