//! Daily score rows written by the scoring engine.

use chrono::{DateTime, NaiveDate, Utc};

use crate::Stage;

/// One person's score for one UTC calendar day.
///
/// Rows are keyed by `(actor_email, score_date)`; rewriting the same key
/// replaces the previous values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersonScore {
    /// Lower-cased actor e-mail.
    pub actor_email: String,
    /// Day the score applies to.
    pub score_date: NaiveDate,
    /// Sum of decayed, weighted event scores over the lookback window.
    pub person_score: f64,
    /// Inferred funnel stage.
    pub stage: Stage,
    /// Most recent touchpoint.
    pub last_touch: Option<String>,
    /// Timestamp of the most recent touchpoint.
    pub last_touch_at: Option<DateTime<Utc>>,
    /// Marketing-qualified lead.
    pub mql_flag: bool,
    /// Sales-qualified lead.
    pub sql_flag: bool,
}

/// One company's score for one UTC calendar day.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompanyScore {
    /// Lower-cased company domain.
    pub company_domain: String,
    /// Day the score applies to.
    pub score_date: NaiveDate,
    /// Sum of decayed, weighted event scores over the lookback window.
    pub company_score: f64,
    /// Most frequent recent stage across the company's events.
    pub stage_mode: Stage,
    /// Distinct actors active within the engagement window.
    pub engaged_contacts: u32,
    /// Score and engagement thresholds were both crossed.
    pub hot_flag: bool,
    /// Day the company became hot.
    pub hot_since: Option<NaiveDate>,
}

/// Round a score to two decimal places for persistence.
///
/// # Examples
/// ```
/// use foura_core::round_score;
///
/// assert_eq!(round_score(29.994_9), 29.99);
/// assert_eq!(round_score(12.345_6), 12.35);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "rounding scales by a power of ten"
)]
pub fn round_score(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(1.234, 1.23)]
    #[case(1.235_000_1, 1.24)]
    #[case(119.999, 120.0)]
    #[expect(
        clippy::float_arithmetic,
        reason = "tests compare floating point values"
    )]
    fn rounds_to_two_decimals(#[case] raw: f64, #[case] expected: f64) {
        assert!((round_score(raw) - expected).abs() < 1e-9);
    }
}
