//! Per-event multipliers of the 4A model.
#![forbid(unsafe_code)]

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::config::{DecayCurve, DepthBounds, DepthMedians};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Diminishing-returns boost for repeated engagement: `1 + ln(1 + n)`.
///
/// # Examples
/// ```
/// use foura_scorer::frequency_multiplier;
///
/// assert_eq!(frequency_multiplier(0), 1.0);
/// assert!(frequency_multiplier(10) > frequency_multiplier(9));
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "frequency boost is a logarithmic curve"
)]
pub fn frequency_multiplier(events_in_window: u32) -> f64 {
    1.0 + f64::from(events_in_window).ln_1p()
}

/// Weighted engagement depth, clamped to `bounds`.
///
/// Each signal is divided by its reference median and weighted 25% scroll,
/// 25% dwell, 50% completion. Absent or non-finite signals contribute zero, so
/// an event without depth data lands on the lower bound. Bounds that are not
/// ordered (`min > max` or either one NaN) also yield `bounds.min`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "depth weighting is a weighted sum of ratios"
)]
pub fn depth_multiplier(
    scroll: Option<f64>,
    dwell_sec: Option<f64>,
    pct_complete: Option<f64>,
    medians: &DepthMedians,
    bounds: &DepthBounds,
) -> f64 {
    let weighted = 0.25 * ratio(scroll, medians.scroll)
        + 0.25 * ratio(dwell_sec, medians.dwell_sec)
        + 0.50 * ratio(pct_complete, medians.pct_complete);
    let unordered = matches!(
        bounds.min.partial_cmp(&bounds.max),
        None | Some(Ordering::Greater)
    );
    if unordered || weighted.is_nan() {
        return bounds.min;
    }
    weighted.clamp(bounds.min, bounds.max)
}

#[expect(clippy::float_arithmetic, reason = "signals are scaled by their median")]
fn ratio(value: Option<f64>, median: f64) -> f64 {
    match value {
        Some(signal) if signal.is_finite() && median.is_finite() && median > 0.0 => {
            signal / median
        }
        _ => 0.0,
    }
}

/// Multiplier for an event that is `age_days` old.
///
/// Negative ages (events dated in the future) decay as if they were new.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "decay is an exponential curve")]
pub fn decay_multiplier(age_days: f64, decay: &DecayCurve) -> f64 {
    decay.base.powf(age_days.max(0.0) / decay.period_days)
}

/// Fractional days between `occurred_at` and `now`, never negative.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "event ages are converted to fractional days well inside f64 precision"
)]
pub fn age_in_days(now: DateTime<Utc>, occurred_at: DateTime<Utc>) -> f64 {
    let millis = now.signed_duration_since(occurred_at).num_milliseconds().max(0);
    millis as f64 / MILLIS_PER_DAY
}
