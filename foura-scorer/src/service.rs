//! The recompute cycle: candidate selection, aggregation and persistence.
#![forbid(unsafe_code)]

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use foura_core::{EventStore, ScoreStore, TopicInterestLookup, WeightSource, WeightTable};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::aggregate::{ScoringContext, score_company, score_person};
use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::topics::TopicCache;

/// Candidate window used when the caller has no preference: two hours.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(7200);

/// Counts of candidates processed by one run.
///
/// Candidates whose events all fall outside the lookback are counted even
/// though no row is written for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Distinct actors with an event ingested inside the window.
    pub actors: usize,
    /// Distinct companies with an event ingested inside the window.
    pub companies: usize,
}

/// Deterministic 4A scoring engine over injected storage.
///
/// The service holds no state between runs. Each call to
/// [`FourAScoringService::run`] reloads the weight table, selects every actor
/// and company with an event ingested inside the trailing window, recomputes
/// their full lookback aggregate and upserts one row per entity for the
/// current UTC day.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// use chrono::{TimeZone, Utc};
/// use foura_core::store::{ScoreStore, SqliteStore};
/// use foura_core::{Event, Stage, WeightRow};
/// use foura_scorer::FourAScoringService;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().unwrap_or_default();
/// let mut store = SqliteStore::open_in_memory("")?;
/// store.initialise_schema()?;
/// store.upsert_weight(&WeightRow::new("demo_request", 40.0, Stage::Solution, "pos"))?;
/// store.append_event(&Event::new("e1", "demo_request", now).with_actor("ada@example.com"))?;
///
/// let service = FourAScoringService::new(store);
/// let summary = service.run_at(now, Duration::from_secs(3600))?;
/// assert_eq!(summary.actors, 1);
///
/// let row = service
///     .store()
///     .person_score("ada@example.com", now.date_naive())?
///     .ok_or("person row missing")?;
/// assert!(row.sql_flag);
/// assert_eq!(row.stage, Stage::Acceptance);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FourAScoringService<S> {
    store: S,
    config: ScoringConfig,
}

impl<S> FourAScoringService<S>
where
    S: EventStore + WeightSource + TopicInterestLookup + ScoreStore,
{
    /// Build a service with the default model parameters.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: ScoringConfig::default(),
        }
    }

    /// Build a service with custom parameters.
    ///
    /// # Errors
    /// Returns [`ScoringError::InvalidConfig`] when `config` fails validation.
    pub fn with_config(store: S, config: ScoringConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Borrow the underlying storage.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Borrow the model parameters.
    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Consume the service and return its storage.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Recompute scores for entities with events ingested within `window`
    /// of the current time.
    ///
    /// # Errors
    /// Returns [`ScoringError`] when storage fails, the weight table is
    /// malformed, or `window` cannot be subtracted from the clock.
    pub fn run(&self, window: Duration) -> Result<RunSummary, ScoringError> {
        self.run_at(Utc::now(), window)
    }

    /// Recompute scores as of `now`.
    ///
    /// # Errors
    /// See [`FourAScoringService::run`].
    pub fn run_at(&self, now: DateTime<Utc>, window: Duration) -> Result<RunSummary, ScoringError> {
        let out_of_range = || ScoringError::WindowOutOfRange {
            seconds: window.as_secs(),
        };
        let span = TimeDelta::from_std(window).map_err(|_| out_of_range())?;
        let window_start = now.checked_sub_signed(span).ok_or_else(out_of_range)?;

        let weights = WeightTable::from_rows(
            self.store.active_weights()?,
            self.config.fallback_weight.clone(),
        )?;
        let actors = self.store.candidate_actors(window_start)?;
        let companies = self.store.candidate_companies(window_start)?;
        info!(
            "4A scoring run at {now}: {} actors and {} companies ingested since {window_start}, {} active weights",
            actors.len(),
            companies.len(),
            weights.len()
        );

        let context = ScoringContext {
            now,
            config: &self.config,
            weights: &weights,
        };
        let mut topics = TopicCache::default();
        for email in &actors {
            self.process_actor(&context, &mut topics, email)?;
        }
        for domain in &companies {
            self.process_company(&context, domain)?;
        }

        let summary = RunSummary {
            actors: actors.len(),
            companies: companies.len(),
        };
        info!(
            "4A scoring run complete: {} actors, {} companies",
            summary.actors, summary.companies
        );
        Ok(summary)
    }

    fn process_actor(
        &self,
        context: &ScoringContext<'_>,
        topics: &mut TopicCache,
        email: &str,
    ) -> Result<(), ScoringError> {
        let lookback = self.config.windows.lookback_days;
        let events = self
            .store
            .events_for_actor(email, context.days_back(lookback))?;
        if events.is_empty() {
            debug!("skipping actor {email}: no events in the last {lookback} days");
            return Ok(());
        }
        let interests = topics.interests(&self.store, email)?;
        if let Some(score) = score_person(context, email, &events, interests) {
            debug!(
                "actor {} scored {:.2} at stage {} (mql={}, sql={})",
                score.actor_email, score.person_score, score.stage, score.mql_flag, score.sql_flag
            );
            self.store.upsert_person_score(&score)?;
        }
        Ok(())
    }

    fn process_company(
        &self,
        context: &ScoringContext<'_>,
        domain: &str,
    ) -> Result<(), ScoringError> {
        let lookback = self.config.windows.lookback_days;
        let events = self
            .store
            .events_for_company(domain, context.days_back(lookback))?;
        if events.is_empty() {
            debug!("skipping company {domain}: no events in the last {lookback} days");
            return Ok(());
        }
        let previous = self.store.latest_company_score(domain, context.today())?;
        if let Some(score) = score_company(context, domain, &events, previous.as_ref()) {
            debug!(
                "company {} scored {:.2} with {} engaged contacts (hot={})",
                score.company_domain, score.company_score, score.engaged_contacts, score.hot_flag
            );
            self.store.upsert_company_score(&score)?;
        }
        Ok(())
    }
}
