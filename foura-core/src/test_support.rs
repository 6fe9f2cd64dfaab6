//! In-memory storage used by unit, behaviour and property tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};

use crate::store::{EventStore, ScoreStore, StoreError, TopicInterestLookup, WeightSource};
use crate::{CompanyScore, Event, PersonScore, WeightRow, identity_key};

type ScoreKey = (String, NaiveDate);

/// Storage implementation holding everything in process memory.
///
/// Events, weights and interests are fixed at construction; score rows are
/// written through [`ScoreStore`] and can be inspected afterwards.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Vec<Event>,
    weights: Vec<WeightRow>,
    interests: HashMap<String, String>,
    person_scores: Mutex<BTreeMap<ScoreKey, PersonScore>>,
    company_scores: Mutex<BTreeMap<ScoreKey, CompanyScore>>,
    fail_writes: bool,
}

impl MemoryStore {
    /// Add events to the store.
    #[must_use]
    pub fn with_events<I>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = Event>,
    {
        self.events.extend(events);
        self.events.sort_by(|left, right| {
            left.occurred_at
                .cmp(&right.occurred_at)
                .then_with(|| left.event_id.cmp(&right.event_id))
        });
        self
    }

    /// Add weight rows, active or not.
    #[must_use]
    pub fn with_weights<I>(mut self, weights: I) -> Self
    where
        I: IntoIterator<Item = WeightRow>,
    {
        self.weights.extend(weights);
        self
    }

    /// Record a raw topic-interest attribute for an actor.
    #[must_use]
    pub fn with_interests(mut self, email: &str, raw: impl Into<String>) -> Self {
        self.interests.insert(identity_key(email), raw.into());
        self
    }

    /// Make every score upsert fail with a backend error.
    #[must_use]
    pub const fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Snapshot of every stored person row, ordered by key.
    #[must_use]
    pub fn person_scores(&self) -> Vec<PersonScore> {
        lock(&self.person_scores).values().cloned().collect()
    }

    /// Snapshot of every stored company row, ordered by key.
    #[must_use]
    pub fn company_scores(&self) -> Vec<CompanyScore> {
        lock(&self.company_scores).values().cloned().collect()
    }

    fn candidates<F>(&self, since: DateTime<Utc>, identity: F) -> Vec<String>
    where
        F: Fn(&Event) -> Option<&String>,
    {
        self.events
            .iter()
            .filter(|event| event.ingested_at >= since)
            .filter_map(&identity)
            .map(|value| identity_key(value.as_str()))
            .filter(|value| !value.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn matching<F>(&self, key: &str, occurred_since: DateTime<Utc>, identity: F) -> Vec<Event>
    where
        F: Fn(&Event) -> Option<&String>,
    {
        let wanted = identity_key(key);
        if wanted.is_empty() {
            return Vec::new();
        }
        self.events
            .iter()
            .filter(|event| event.occurred_at >= occurred_since)
            .filter(|event| identity(event).is_some_and(|value| identity_key(value) == wanted))
            .cloned()
            .collect()
    }

    fn check_writable(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::backend(
                operation,
                io::Error::other("memory store configured to fail writes"),
            ));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn score_key(identity: &str, day: NaiveDate) -> ScoreKey {
    (identity_key(identity), day)
}

impl EventStore for MemoryStore {
    fn candidate_actors(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        Ok(self.candidates(since, |event| event.actor_email.as_ref()))
    }

    fn candidate_companies(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        Ok(self.candidates(since, |event| event.company_domain.as_ref()))
    }

    fn events_for_actor(
        &self,
        email: &str,
        occurred_since: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        Ok(self.matching(email, occurred_since, |event| event.actor_email.as_ref()))
    }

    fn events_for_company(
        &self,
        domain: &str,
        occurred_since: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        Ok(self.matching(domain, occurred_since, |event| {
            event.company_domain.as_ref()
        }))
    }
}

impl WeightSource for MemoryStore {
    fn active_weights(&self) -> Result<Vec<WeightRow>, StoreError> {
        Ok(self
            .weights
            .iter()
            .filter(|row| row.is_active)
            .cloned()
            .collect())
    }
}

impl TopicInterestLookup for MemoryStore {
    fn raw_interests(&self, email: &str) -> Result<Option<String>, StoreError> {
        Ok(self.interests.get(&identity_key(email)).cloned())
    }
}

impl ScoreStore for MemoryStore {
    fn upsert_person_score(&self, score: &PersonScore) -> Result<(), StoreError> {
        self.check_writable("upsert person score")?;
        lock(&self.person_scores).insert(
            score_key(&score.actor_email, score.score_date),
            score.clone(),
        );
        Ok(())
    }

    fn upsert_company_score(&self, score: &CompanyScore) -> Result<(), StoreError> {
        self.check_writable("upsert company score")?;
        lock(&self.company_scores).insert(
            score_key(&score.company_domain, score.score_date),
            score.clone(),
        );
        Ok(())
    }

    fn person_score(
        &self,
        email: &str,
        score_date: NaiveDate,
    ) -> Result<Option<PersonScore>, StoreError> {
        Ok(lock(&self.person_scores)
            .get(&score_key(email, score_date))
            .cloned())
    }

    fn company_score(
        &self,
        domain: &str,
        score_date: NaiveDate,
    ) -> Result<Option<CompanyScore>, StoreError> {
        Ok(lock(&self.company_scores)
            .get(&score_key(domain, score_date))
            .cloned())
    }

    fn latest_company_score(
        &self,
        domain: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<CompanyScore>, StoreError> {
        let wanted = identity_key(domain);
        Ok(lock(&self.company_scores)
            .iter()
            .filter(|((key, day), _)| *key == wanted && *day <= on_or_before)
            .max_by_key(|((_, day), _)| *day)
            .map(|(_, score)| score.clone()))
    }
}
