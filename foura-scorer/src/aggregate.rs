//! Person and company aggregation for a single scoring instant.
#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use foura_core::{
    CompanyScore, Event, PersonScore, Stage, WeightTable, identity_key, round_score,
};
use log::{debug, warn};

use crate::config::{HotSincePolicy, ScoringConfig, Thresholds};
use crate::multipliers::{age_in_days, decay_multiplier, depth_multiplier, frequency_multiplier};
use crate::stage::infer_stage;
use crate::topics::{parse_event_topics, topic_affinity};

/// Everything an aggregation needs to know about the current run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScoringContext<'run> {
    pub(crate) now: DateTime<Utc>,
    pub(crate) config: &'run ScoringConfig,
    pub(crate) weights: &'run WeightTable,
}

impl ScoringContext<'_> {
    pub(crate) fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub(crate) fn days_back(&self, days: u32) -> DateTime<Utc> {
        self.now
            .checked_sub_signed(TimeDelta::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn count_since(&self, events: &[Event], days: u32) -> u32 {
        let cutoff = self.days_back(days);
        let count = events.iter().filter(|event| event.occurred_at >= cutoff).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Score a single event. `interests` is `None` for company aggregation,
    /// which never applies topic affinity.
    #[expect(
        clippy::float_arithmetic,
        reason = "event scores are products of multipliers"
    )]
    pub(crate) fn event_score(
        &self,
        event: &Event,
        frequency_count: u32,
        interests: Option<&[String]>,
    ) -> f64 {
        let config = self.config;
        let row = self.weights.resolve(&event.touchpoint);
        if self.weights.lookup(&event.touchpoint).is_none() {
            debug!(
                "event {} uses unconfigured touchpoint {:?}; applying fallback weight",
                event.event_id, event.touchpoint
            );
        }
        let depth = depth_multiplier(
            event.depth_scroll,
            event.depth_dwell_sec,
            event.depth_pct_complete,
            &config.depth_medians,
            &config.depth_bounds,
        );
        let affinity = interests.map_or(1.0, |topics| self.affinity(event, topics));
        let decay = decay_multiplier(age_in_days(self.now, event.occurred_at), &config.decay);
        row.base_weight * frequency_multiplier(frequency_count) * depth * affinity * decay
    }

    fn affinity(&self, event: &Event, interests: &[String]) -> f64 {
        if interests.is_empty() {
            return 1.0;
        }
        let Some(raw) = event.topic_tax.as_deref() else {
            return 1.0;
        };
        match parse_event_topics(raw) {
            Some(topics) => topic_affinity(&topics, interests, self.config.topic_boost),
            None => {
                warn!(
                    "event {} has malformed topic JSON; no topic boost applied",
                    event.event_id
                );
                1.0
            }
        }
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "entity totals sum event scores"
    )]
    fn total(&self, events: &[Event], interests: Option<&[String]>) -> f64 {
        let frequency_count = self.count_since(events, self.config.windows.frequency_days);
        events
            .iter()
            .map(|event| self.event_score(event, frequency_count, interests))
            .sum()
    }

    fn stage(&self, events: &[Event]) -> Stage {
        infer_stage(
            events,
            self.weights,
            self.days_back(self.config.windows.stage_days),
        )
    }

    fn has_recent_positive(&self, events: &[Event]) -> bool {
        let cutoff = self.days_back(self.config.windows.recent_positive_days);
        events.iter().any(|event| {
            event.occurred_at >= cutoff
                && self
                    .weights
                    .lookup(&event.touchpoint)
                    .is_some_and(foura_core::WeightRow::is_positive)
        })
    }

    fn engaged_contacts(&self, events: &[Event]) -> u32 {
        let cutoff = self.days_back(self.config.windows.engagement_days);
        let contacts: BTreeSet<String> = events
            .iter()
            .filter(|event| event.occurred_at >= cutoff)
            .filter_map(|event| event.actor_email.as_deref())
            .map(identity_key)
            .filter(|email| !email.is_empty())
            .collect();
        u32::try_from(contacts.len()).unwrap_or(u32::MAX)
    }
}

/// MQL and SQL flags for a person total.
///
/// Flags are derived from the unrounded total.
#[must_use]
pub fn qualification_flags(
    total: f64,
    stage: &Stage,
    has_recent_positive: bool,
    thresholds: &Thresholds,
) -> (bool, bool) {
    let mql = total >= thresholds.mql && stage.is_mql_stage();
    let sql = total >= thresholds.sql || has_recent_positive;
    (mql, sql)
}

/// Whether a company crosses both hot thresholds.
#[must_use]
pub fn is_hot(total: f64, engaged_contacts: u32, thresholds: &Thresholds) -> bool {
    total >= thresholds.hot_company && engaged_contacts >= thresholds.hot_min_contacts
}

/// Resolve `hot_since` for a company evaluated on `today`.
///
/// `previous` is the latest stored row dated on or before `today`.
#[must_use]
pub fn resolve_hot_since(
    hot: bool,
    today: NaiveDate,
    previous: Option<&CompanyScore>,
    policy: HotSincePolicy,
) -> Option<NaiveDate> {
    if !hot {
        return None;
    }
    let carried = match policy {
        HotSincePolicy::CarryForward => previous
            .filter(|row| row.hot_flag)
            .and_then(|row| row.hot_since)
            .filter(|since| *since <= today),
        HotSincePolicy::Restamp => None,
    };
    Some(carried.unwrap_or(today))
}

/// Last touch: the latest event, the earliest stored wins on equal timestamps.
fn last_touch(events: &[Event]) -> Option<&Event> {
    let mut latest: Option<&Event> = None;
    for event in events {
        if latest.is_none_or(|current| event.occurred_at > current.occurred_at) {
            latest = Some(event);
        }
    }
    latest
}

pub(crate) fn score_person(
    context: &ScoringContext<'_>,
    email: &str,
    events: &[Event],
    interests: &[String],
) -> Option<PersonScore> {
    if events.is_empty() {
        return None;
    }
    let total = context.total(events, Some(interests));
    let stage = context.stage(events);
    let (mql_flag, sql_flag) = qualification_flags(
        total,
        &stage,
        context.has_recent_positive(events),
        &context.config.thresholds,
    );
    let touch = last_touch(events);
    Some(PersonScore {
        actor_email: identity_key(email),
        score_date: context.today(),
        person_score: round_score(total),
        stage,
        last_touch: touch.map(|event| event.touchpoint.clone()),
        last_touch_at: touch.map(|event| event.occurred_at),
        mql_flag,
        sql_flag,
    })
}

pub(crate) fn score_company(
    context: &ScoringContext<'_>,
    domain: &str,
    events: &[Event],
    previous: Option<&CompanyScore>,
) -> Option<CompanyScore> {
    if events.is_empty() {
        return None;
    }
    let total = context.total(events, None);
    let engaged_contacts = context.engaged_contacts(events);
    let hot_flag = is_hot(total, engaged_contacts, &context.config.thresholds);
    Some(CompanyScore {
        company_domain: identity_key(domain),
        score_date: context.today(),
        company_score: round_score(total),
        stage_mode: context.stage(events),
        engaged_contacts,
        hot_flag,
        hot_since: resolve_hot_since(
            hot_flag,
            context.today(),
            previous,
            context.config.hot_since,
        ),
    })
}
