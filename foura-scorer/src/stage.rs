//! Funnel-stage inference over recent events.
#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use foura_core::{Event, Stage, WeightTable};

/// Infer the funnel stage from events that occurred at or after `cutoff`.
///
/// Any positive-category event means [`Stage::Acceptance`]. Otherwise the
/// most frequent stage wins, taken from each event's hint or, failing that,
/// its touchpoint's default stage. Ties go to the stage seen first in event
/// order. Without qualifying events the result is [`Stage::Attention`].
#[must_use]
pub fn infer_stage(events: &[Event], weights: &WeightTable, cutoff: DateTime<Utc>) -> Stage {
    let mut tally: Vec<(Stage, u32)> = Vec::new();
    for event in events.iter().filter(|event| event.occurred_at >= cutoff) {
        let row = weights.resolve(&event.touchpoint);
        if row.is_positive() {
            return Stage::Acceptance;
        }
        let stage = Stage::from_hint(event.stage_hint.as_deref())
            .unwrap_or_else(|| row.stage_default.clone());
        match tally.iter_mut().find(|(seen, _)| *seen == stage) {
            Some((_, count)) => *count += 1,
            None => tally.push((stage, 1)),
        }
    }

    let mut best: Option<(Stage, u32)> = None;
    for (stage, count) in tally {
        if best.as_ref().is_none_or(|(_, top)| count > *top) {
            best = Some((stage, count));
        }
    }
    best.map(|(stage, _)| stage).unwrap_or_default()
}
