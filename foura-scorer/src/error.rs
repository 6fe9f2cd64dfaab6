//! Error types raised by a scoring run.
#![forbid(unsafe_code)]

use foura_core::{StoreError, WeightTableError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that abort a scoring run.
///
/// Rows written before the failure stay written; a rerun recomputes them.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Reading or writing through a storage trait failed.
    #[error("scoring storage failure")]
    Store(#[from] StoreError),
    /// The active weight configuration is unusable.
    #[error("invalid touchpoint weight configuration")]
    InvalidWeights(#[from] WeightTableError),
    /// The scoring parameters are unusable.
    #[error("invalid scoring configuration")]
    InvalidConfig(#[from] ConfigError),
    /// The candidate window cannot be represented relative to the clock.
    #[error("candidate window of {seconds} seconds is out of range")]
    WindowOutOfRange {
        /// Requested window length.
        seconds: u64,
    },
}
