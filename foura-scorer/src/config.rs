//! Tunable parameters for the 4A scoring model.
#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use foura_core::WeightRow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trailing windows, in days, measured back from the scoring instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWindows {
    /// Events older than this never contribute.
    pub lookback_days: u32,
    /// Window used for stage inference.
    pub stage_days: u32,
    /// Window used to count engaged company contacts.
    pub engagement_days: u32,
    /// Window used for the frequency multiplier.
    pub frequency_days: u32,
    /// Window in which a positive signal qualifies an actor for SQL.
    pub recent_positive_days: u32,
}

impl Default for ScoringWindows {
    fn default() -> Self {
        Self {
            lookback_days: 120,
            stage_days: 45,
            engagement_days: 21,
            frequency_days: 30,
            recent_positive_days: 14,
        }
    }
}

/// Reference medians the depth signals are divided by.
///
/// A median that is zero or negative makes its signal contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthMedians {
    /// Scroll depth, percent.
    pub scroll: f64,
    /// Dwell time, seconds.
    pub dwell_sec: f64,
    /// Completion, percent.
    pub pct_complete: f64,
}

impl Default for DepthMedians {
    fn default() -> Self {
        Self {
            scroll: 80.0,
            dwell_sec: 45.0,
            pct_complete: 100.0,
        }
    }
}

/// Inclusive range the depth multiplier is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthBounds {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Default for DepthBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 1.2 }
    }
}

/// Exponential decay applied to an event's age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayCurve {
    /// Multiplier applied once per period.
    pub base: f64,
    /// Period length in days.
    pub period_days: f64,
}

impl Default for DecayCurve {
    fn default() -> Self {
        Self {
            base: 0.9,
            period_days: 7.0,
        }
    }
}

/// Qualification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum person score for MQL.
    pub mql: f64,
    /// Person score at which an actor is SQL regardless of signals.
    pub sql: f64,
    /// Minimum company score for the hot flag.
    pub hot_company: f64,
    /// Minimum engaged contacts for the hot flag.
    pub hot_min_contacts: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            mql: 30.0,
            sql: 60.0,
            hot_company: 120.0,
            hot_min_contacts: 3,
        }
    }
}

/// How `hot_since` is written for a company that is hot today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HotSincePolicy {
    /// Keep the date from the latest stored row when that row was already hot.
    #[default]
    CarryForward,
    /// Stamp today's date on every hot row.
    Restamp,
}

impl HotSincePolicy {
    /// Stable textual form used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CarryForward => "carry-forward",
            Self::Restamp => "restamp",
        }
    }
}

impl fmt::Display for HotSincePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HotSincePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "carry-forward" | "carry_forward" => Ok(Self::CarryForward),
            "restamp" => Ok(Self::Restamp),
            _ => Err(ConfigError::UnknownHotSincePolicy {
                value: s.to_owned(),
            }),
        }
    }
}

/// Complete parameter set for one scoring service.
///
/// # Examples
/// ```
/// use foura_scorer::{HotSincePolicy, ScoringConfig};
///
/// let config = ScoringConfig {
///     hot_since: HotSincePolicy::Restamp,
///     ..ScoringConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.windows.lookback_days, 120);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Trailing windows.
    pub windows: ScoringWindows,
    /// Depth reference medians.
    pub depth_medians: DepthMedians,
    /// Depth multiplier clamp.
    pub depth_bounds: DepthBounds,
    /// Multiplier applied when an event matches the actor's interests.
    pub topic_boost: f64,
    /// Time decay.
    pub decay: DecayCurve,
    /// Qualification thresholds.
    pub thresholds: Thresholds,
    /// Row used for touchpoints without active configuration.
    pub fallback_weight: WeightRow,
    /// `hot_since` behaviour.
    pub hot_since: HotSincePolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            windows: ScoringWindows::default(),
            depth_medians: DepthMedians::default(),
            depth_bounds: DepthBounds::default(),
            topic_boost: 1.2,
            decay: DecayCurve::default(),
            thresholds: Thresholds::default(),
            fallback_weight: WeightRow::fallback(),
            hot_since: HotSincePolicy::default(),
        }
    }
}

impl ScoringConfig {
    /// Check that the parameters describe a usable model.
    ///
    /// # Errors
    /// Returns [`ConfigError`] describing the first unusable parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_windows()?;
        for (field, value) in [
            ("depth_medians.scroll", self.depth_medians.scroll),
            ("depth_medians.dwell_sec", self.depth_medians.dwell_sec),
            ("depth_medians.pct_complete", self.depth_medians.pct_complete),
        ] {
            require_finite(field, value)?;
        }

        let bounds = self.depth_bounds;
        require_finite("depth_bounds.min", bounds.min)?;
        require_finite("depth_bounds.max", bounds.max)?;
        if bounds.min < 0.0 || bounds.min > bounds.max {
            return Err(ConfigError::DepthBounds {
                min: bounds.min,
                max: bounds.max,
            });
        }

        require_non_negative("topic_boost", self.topic_boost)?;
        require_finite("decay.base", self.decay.base)?;
        if self.decay.base <= 0.0 || self.decay.base > 1.0 {
            return Err(ConfigError::DecayBase {
                base: self.decay.base,
            });
        }
        require_finite("decay.period_days", self.decay.period_days)?;
        if self.decay.period_days <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "decay.period_days",
            });
        }

        require_non_negative("thresholds.mql", self.thresholds.mql)?;
        require_non_negative("thresholds.sql", self.thresholds.sql)?;
        require_non_negative("thresholds.hot_company", self.thresholds.hot_company)?;
        require_non_negative("fallback_weight.base_weight", self.fallback_weight.base_weight)
    }

    fn validate_windows(&self) -> Result<(), ConfigError> {
        let windows = self.windows;
        if windows.lookback_days == 0 {
            return Err(ConfigError::ZeroWindow {
                window: "lookback_days",
            });
        }
        for (window, days) in [
            ("stage_days", windows.stage_days),
            ("engagement_days", windows.engagement_days),
            ("frequency_days", windows.frequency_days),
            ("recent_positive_days", windows.recent_positive_days),
        ] {
            if days == 0 {
                return Err(ConfigError::ZeroWindow { window });
            }
            if days > windows.lookback_days {
                return Err(ConfigError::WindowExceedsLookback {
                    window,
                    days,
                    lookback_days: windows.lookback_days,
                });
            }
        }
        Ok(())
    }
}

const fn require_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field });
    }
    Ok(())
}

/// Reasons a [`ScoringConfig`] is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A trailing window was zero days long.
    #[error("window {window} must be at least one day")]
    ZeroWindow {
        /// Name of the window.
        window: &'static str,
    },
    /// A sub-window reaches further back than the events that are fetched.
    #[error("window {window} ({days} days) exceeds the {lookback_days}-day lookback")]
    WindowExceedsLookback {
        /// Name of the window.
        window: &'static str,
        /// Configured length.
        days: u32,
        /// Configured lookback.
        lookback_days: u32,
    },
    /// A parameter was NaN or infinite.
    #[error("{field} must be finite")]
    NotFinite {
        /// Offending parameter.
        field: &'static str,
    },
    /// A parameter was negative.
    #[error("{field} must not be negative")]
    Negative {
        /// Offending parameter.
        field: &'static str,
    },
    /// A parameter was zero or negative.
    #[error("{field} must be positive")]
    NotPositive {
        /// Offending parameter.
        field: &'static str,
    },
    /// The depth clamp was empty or started below zero.
    #[error("depth bounds [{min}, {max}] must satisfy 0 <= min <= max")]
    DepthBounds {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// The decay base does not shrink scores over time.
    #[error("decay base {base} must lie in (0, 1]")]
    DecayBase {
        /// Configured base.
        base: f64,
    },
    /// A `hot_since` policy name was not recognised.
    #[error("unknown hot-since policy {value:?}; expected carry-forward or restamp")]
    UnknownHotSincePolicy {
        /// Text that failed to parse.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_are_valid() {
        assert_eq!(ScoringConfig::default().validate(), Ok(()));
    }

    #[rstest]
    fn stage_window_may_not_exceed_lookback() {
        let mut config = ScoringConfig::default();
        config.windows.stage_days = 200;
        assert_eq!(
            config.validate(),
            Err(ConfigError::WindowExceedsLookback {
                window: "stage_days",
                days: 200,
                lookback_days: 120,
            })
        );
    }

    #[rstest]
    fn zero_windows_are_rejected() {
        let mut config = ScoringConfig::default();
        config.windows.engagement_days = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroWindow {
                window: "engagement_days"
            })
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.5)]
    #[case(f64::NAN)]
    fn decay_base_must_shrink_scores(#[case] base: f64) {
        let mut config = ScoringConfig::default();
        config.decay.base = base;
        assert!(config.validate().is_err());
    }

    #[rstest]
    fn inverted_depth_bounds_are_rejected() {
        let mut config = ScoringConfig::default();
        config.depth_bounds = DepthBounds { min: 1.5, max: 1.0 };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DepthBounds { .. })
        ));
    }

    #[rstest]
    fn zero_median_is_allowed() {
        let mut config = ScoringConfig::default();
        config.depth_medians.dwell_sec = 0.0;
        assert_eq!(config.validate(), Ok(()));
    }

    #[rstest]
    #[case("carry-forward", HotSincePolicy::CarryForward)]
    #[case("Restamp", HotSincePolicy::Restamp)]
    #[case(" carry_forward ", HotSincePolicy::CarryForward)]
    fn parses_hot_since_policies(#[case] raw: &str, #[case] expected: HotSincePolicy) {
        assert_eq!(raw.parse::<HotSincePolicy>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_hot_since_policy() {
        assert!("forever".parse::<HotSincePolicy>().is_err());
    }
}
