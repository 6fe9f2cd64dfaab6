//! Deterministic 4A lead scoring.
//!
//! The crate turns touchpoint events into daily person and company scores.
//! Each event contributes
//!
//! ```text
//! base_weight
//!   × (1 + ln(1 + events in the trailing 30 days))
//!   × clamp(depth, 0.5, 1.2)
//!   × topic affinity (1.2 on an interest match, people only)
//!   × 0.9 ^ (age in days / 7)
//! ```
//!
//! and the per-entity totals drive stage inference, MQL/SQL qualification and
//! the hot-company flag. [`FourAScoringService`] runs the cycle against any
//! storage implementing the `foura_core` storage traits.
//!
//! # Examples
//!
//! ```no_run
//! use foura_core::store::SqliteStore;
//! use foura_scorer::{DEFAULT_WINDOW, FourAScoringService};
//!
//! let store = SqliteStore::open("foura.db", "wp_").expect("open database");
//! let summary = FourAScoringService::new(store)
//!     .run(DEFAULT_WINDOW)
//!     .expect("scoring run");
//! println!("{} actors, {} companies", summary.actors, summary.companies);
//! ```

#![forbid(unsafe_code)]

mod aggregate;
mod config;
mod error;
mod multipliers;
mod service;
mod stage;
mod topics;

pub use aggregate::{is_hot, qualification_flags, resolve_hot_since};
pub use config::{
    ConfigError, DecayCurve, DepthBounds, DepthMedians, HotSincePolicy, ScoringConfig,
    ScoringWindows, Thresholds,
};
pub use error::ScoringError;
pub use multipliers::{age_in_days, decay_multiplier, depth_multiplier, frequency_multiplier};
pub use service::{DEFAULT_WINDOW, FourAScoringService, RunSummary};
pub use stage::infer_stage;
pub use topics::{TopicCache, parse_event_topics, parse_interests, topic_affinity};

#[cfg(test)]
mod tests;
