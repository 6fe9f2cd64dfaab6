//! Touchpoint weight configuration.
//!
//! Administrators maintain one active [`WeightRow`] per touchpoint. The scorer
//! loads the active rows once per run into a [`WeightTable`], which resolves
//! unknown touchpoints to a fallback row instead of dropping the event.

use std::collections::HashMap;

use thiserror::Error;

use crate::Stage;

/// Category marking acceptance-positive touchpoints.
pub const POSITIVE_CATEGORY: &str = "pos";

/// Category assigned to the fallback row.
pub const FALLBACK_CATEGORY: &str = "low";

/// Base weight assigned to touchpoints without configuration.
pub const FALLBACK_BASE_WEIGHT: f64 = 8.0;

/// Normalise a touchpoint into its lookup key.
///
/// Keys are lower-cased and stripped of every character other than ASCII
/// letters, digits, `_` and `-`.
///
/// # Examples
/// ```
/// use foura_core::touchpoint_key;
///
/// assert_eq!(touchpoint_key(" Pricing Page-View! "), "pricingpage-view");
/// assert_eq!(touchpoint_key("email_open"), "email_open");
/// ```
#[must_use]
pub fn touchpoint_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Configured weight for a single touchpoint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightRow {
    /// Touchpoint identifier.
    pub touchpoint: String,
    /// Base score contributed by one event, before multipliers.
    pub base_weight: f64,
    /// Stage implied by the touchpoint when the event carries no hint.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stage_default: Stage,
    /// Signal category; `pos` marks acceptance-positive touchpoints.
    #[cfg_attr(feature = "serde", serde(default = "fallback_category"))]
    pub category: String,
    /// Inactive rows are ignored by the scorer.
    #[cfg_attr(feature = "serde", serde(default = "active_by_default"))]
    pub is_active: bool,
}

#[cfg(feature = "serde")]
fn fallback_category() -> String {
    FALLBACK_CATEGORY.to_owned()
}

#[cfg(feature = "serde")]
const fn active_by_default() -> bool {
    true
}

impl WeightRow {
    /// Build an active weight row.
    #[must_use]
    pub fn new(
        touchpoint: impl Into<String>,
        base_weight: f64,
        stage_default: Stage,
        category: impl Into<String>,
    ) -> Self {
        Self {
            touchpoint: touchpoint.into(),
            base_weight,
            stage_default,
            category: category.into(),
            is_active: true,
        }
    }

    /// Row used for touchpoints that have no active configuration.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(
            "unknown",
            FALLBACK_BASE_WEIGHT,
            Stage::Attention,
            FALLBACK_CATEGORY,
        )
    }

    /// Report whether the row marks an acceptance-positive signal.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.category == POSITIVE_CATEGORY
    }

    fn normalised(self) -> Self {
        let category = self.category.trim().to_lowercase();
        Self {
            touchpoint: touchpoint_key(&self.touchpoint),
            category: if category.is_empty() {
                FALLBACK_CATEGORY.to_owned()
            } else {
                category
            },
            ..self
        }
    }
}

/// Errors raised while assembling a [`WeightTable`].
#[derive(Debug, Error, PartialEq)]
pub enum WeightTableError {
    /// A base weight was negative, NaN or infinite.
    #[error("base weight {value} for touchpoint {touchpoint} must be finite and non-negative")]
    InvalidBaseWeight {
        /// Touchpoint carrying the bad weight.
        touchpoint: String,
        /// Offending value.
        value: f64,
    },
    /// A row normalised to an empty touchpoint key.
    #[error("touchpoint {raw:?} does not contain any usable key characters")]
    EmptyTouchpoint {
        /// Touchpoint as configured.
        raw: String,
    },
}

/// Active weight rows keyed by normalised touchpoint.
///
/// # Examples
/// ```
/// use foura_core::{Stage, WeightRow, WeightTable};
///
/// # fn main() -> Result<(), foura_core::WeightTableError> {
/// let table = WeightTable::from_rows(
///     [WeightRow::new("Demo_Request", 40.0, Stage::Solution, "pos")],
///     WeightRow::fallback(),
/// )?;
/// assert!(table.resolve("demo_request").is_positive());
/// assert_eq!(table.resolve("never-configured").base_weight, 8.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    rows: HashMap<String, WeightRow>,
    fallback: WeightRow,
}

impl WeightTable {
    /// Build a table from configured rows.
    ///
    /// Inactive rows are skipped. When two active rows normalise to the same
    /// key, the later one wins.
    ///
    /// # Errors
    /// Returns [`WeightTableError`] when an active row carries an unusable
    /// base weight or touchpoint.
    pub fn from_rows<I>(rows: I, fallback: WeightRow) -> Result<Self, WeightTableError>
    where
        I: IntoIterator<Item = WeightRow>,
    {
        let mut map = HashMap::new();
        for row in rows.into_iter().filter(|row| row.is_active) {
            if !row.base_weight.is_finite() || row.base_weight < 0.0 {
                return Err(WeightTableError::InvalidBaseWeight {
                    touchpoint: row.touchpoint,
                    value: row.base_weight,
                });
            }
            let raw = row.touchpoint.clone();
            let normalised = row.normalised();
            if normalised.touchpoint.is_empty() {
                return Err(WeightTableError::EmptyTouchpoint { raw });
            }
            map.insert(normalised.touchpoint.clone(), normalised);
        }
        Ok(Self {
            rows: map,
            fallback,
        })
    }

    /// Return the configured row for a touchpoint, if any.
    #[must_use]
    pub fn lookup(&self, touchpoint: &str) -> Option<&WeightRow> {
        self.rows.get(&touchpoint_key(touchpoint))
    }

    /// Return the configured row, or the fallback for unknown touchpoints.
    #[must_use]
    pub fn resolve(&self, touchpoint: &str) -> &WeightRow {
        self.lookup(touchpoint).unwrap_or(&self.fallback)
    }

    /// Return the number of active rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Report whether no rows are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            fallback: WeightRow::fallback(),
        }
    }
}
