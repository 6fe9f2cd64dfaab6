//! Unit coverage for the scoring service over in-memory storage.
#![forbid(unsafe_code)]

use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use foura_core::test_support::MemoryStore;
use foura_core::{Event, ScoreStore, Stage, WeightRow};
use rstest::{fixture, rstest};

use crate::{
    ConfigError, FourAScoringService, HotSincePolicy, RunSummary, ScoringConfig, ScoringError,
};

const HOUR: Duration = Duration::from_secs(3600);

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 30, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn today() -> NaiveDate {
    now().date_naive()
}

fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - TimeDelta::hours(hours)
}

#[fixture]
fn weights() -> Vec<WeightRow> {
    vec![
        WeightRow::new("email_open", 3.0, Stage::Attention, "low"),
        WeightRow::new("case_study", 10.0, Stage::Diagnosis, "mid"),
        WeightRow::new("pricing_view", 15.0, Stage::Solution, "high"),
        WeightRow::new("demo_request", 40.0, Stage::Solution, "pos"),
        WeightRow::new("exec_briefing", 17.5, Stage::Solution, "high"),
    ]
}

fn close(left: f64, right: f64) -> bool {
    #[expect(clippy::float_arithmetic, reason = "tolerance comparison")]
    let delta = (left - right).abs();
    delta < 1e-9
}

#[rstest]
fn reruns_on_the_same_day_are_idempotent(weights: Vec<WeightRow>) {
    let store = MemoryStore::default().with_weights(weights).with_events([
        Event::new("e1", "case_study", hours_ago(30)).with_actor("ada@example.com").ingested(hours_ago(1)),
        Event::new("e2", "pricing_view", hours_ago(1)).with_actor("ada@example.com").with_company("example.com"),
    ]);
    let service = FourAScoringService::new(store);

    let first = service.run_at(now(), HOUR).expect("first run");
    let people = service.store().person_scores();
    let companies = service.store().company_scores();
    let second = service.run_at(now(), HOUR).expect("second run");

    assert_eq!(first, RunSummary { actors: 1, companies: 1 });
    assert_eq!(first, second);
    assert_eq!(service.store().person_scores(), people);
    assert_eq!(service.store().company_scores(), companies);
    assert_eq!(people.len(), 1);
}

#[rstest]
#[expect(clippy::float_arithmetic, reason = "expected score is computed")]
fn unknown_touchpoints_use_the_fallback_row(weights: Vec<WeightRow>) {
    let store = MemoryStore::default()
        .with_weights(weights)
        .with_events([Event::new("e1", "podcast_listen", now()).with_actor("ada@example.com")]);
    let service = FourAScoringService::new(store);

    service.run_at(now(), HOUR).expect("run succeeds");

    let row = service
        .store()
        .person_score("ada@example.com", today())
        .expect("memory store never fails")
        .expect("row written");
    let expected = foura_core::round_score(8.0 * (1.0 + 2.0_f64.ln()) * 0.5);
    assert!(close(row.person_score, expected), "got {}", row.person_score);
    assert_eq!(row.stage, Stage::Attention);
    assert!(!row.sql_flag);
    assert_eq!(row.last_touch.as_deref(), Some("podcast_listen"));
}

#[rstest]
fn stage_hints_override_touchpoint_defaults(weights: Vec<WeightRow>) {
    let store = MemoryStore::default().with_weights(weights).with_events([
        Event::new("e1", "email_open", hours_ago(3))
            .with_actor("ada@example.com")
            .with_stage_hint("Diagnosis"),
        Event::new("e2", "email_open", hours_ago(2))
            .with_actor("ada@example.com")
            .with_stage_hint("diagnosis"),
        Event::new("e3", "pricing_view", hours_ago(1)).with_actor("ada@example.com"),
    ]);
    let service = FourAScoringService::new(store);

    service.run_at(now(), HOUR).expect("run succeeds");

    let row = service
        .store()
        .person_score("ada@example.com", today())
        .expect("memory store never fails")
        .expect("row written");
    assert_eq!(row.stage, Stage::Diagnosis);
}

#[rstest]
fn recent_positive_signal_makes_an_actor_sql(weights: Vec<WeightRow>) {
    let store = MemoryStore::default().with_weights(weights).with_events([Event::new(
        "e1",
        "demo_request",
        hours_ago(1),
    )
    .with_actor("ada@example.com")]);
    let service = FourAScoringService::new(store);

    service.run_at(now(), HOUR).expect("run succeeds");

    let row = service
        .store()
        .person_score("ada@example.com", today())
        .expect("memory store never fails")
        .expect("row written");
    assert!(row.sql_flag);
    assert!(!row.mql_flag);
    assert_eq!(row.stage, Stage::Acceptance);
}

fn briefing(id: &str, actor: &str, at: DateTime<Utc>) -> Event {
    Event::new(id, "exec_briefing", at)
        .with_actor(actor)
        .with_company("acme.io")
        .with_depth(None, None, Some(200.0))
}

#[rstest]
#[case(["a@acme.io", "a@acme.io", "b@acme.io"], false, 2)]
#[case(["a@acme.io", "b@acme.io", "c@acme.io"], true, 3)]
fn hot_flag_needs_three_engaged_contacts(
    weights: Vec<WeightRow>,
    #[case] actors: [&str; 3],
    #[case] hot: bool,
    #[case] contacts: u32,
) {
    let events = actors
        .iter()
        .enumerate()
        .map(|(index, actor)| briefing(&format!("b{index}"), actor, now()));
    let store = MemoryStore::default().with_weights(weights).with_events(events);
    let service = FourAScoringService::new(store);

    service.run_at(now(), HOUR).expect("run succeeds");

    let row = service
        .store()
        .company_score("acme.io", today())
        .expect("memory store never fails")
        .expect("row written");
    assert!(row.company_score > 125.0 && row.company_score < 126.0, "got {}", row.company_score);
    assert_eq!(row.engaged_contacts, contacts);
    assert_eq!(row.hot_flag, hot);
    assert_eq!(row.hot_since, hot.then(today));
}

#[rstest]
#[case(HotSincePolicy::CarryForward, 29)]
#[case(HotSincePolicy::Restamp, 30)]
fn hot_since_follows_the_configured_policy(
    weights: Vec<WeightRow>,
    #[case] policy: HotSincePolicy,
    #[case] expected_day: u32,
) {
    let yesterday = now() - TimeDelta::days(1);
    let store = MemoryStore::default().with_weights(weights).with_events(
        ["a@acme.io", "b@acme.io", "c@acme.io"]
            .iter()
            .enumerate()
            .map(|(index, actor)| briefing(&format!("b{index}"), actor, yesterday)),
    );
    let config = ScoringConfig {
        hot_since: policy,
        ..ScoringConfig::default()
    };
    let service = FourAScoringService::with_config(store, config).expect("valid config");

    service
        .run_at(yesterday, HOUR)
        .expect("first run succeeds");
    service
        .run_at(now(), HOUR * 48)
        .expect("second run succeeds");

    let row = service
        .store()
        .company_score("acme.io", today())
        .expect("memory store never fails")
        .expect("row written");
    assert!(row.hot_flag);
    assert_eq!(
        row.hot_since,
        NaiveDate::from_ymd_opt(2026, 4, expected_day)
    );
}

#[rstest]
fn candidates_outside_the_lookback_are_counted_but_not_written(weights: Vec<WeightRow>) {
    let store = MemoryStore::default().with_weights(weights).with_events([Event::new(
        "ancient",
        "case_study",
        now() - TimeDelta::days(200),
    )
    .with_actor("ada@example.com")
    .with_company("example.com")
    .ingested(hours_ago(1))]);
    let service = FourAScoringService::new(store);

    let summary = service.run_at(now(), HOUR * 2).expect("run succeeds");

    assert_eq!(summary, RunSummary { actors: 1, companies: 1 });
    assert!(service.store().person_scores().is_empty());
    assert!(service.store().company_scores().is_empty());
}

#[rstest]
fn padded_identities_are_scored_under_their_canonical_key(weights: Vec<WeightRow>) {
    let store = MemoryStore::default().with_weights(weights).with_events([Event::new(
        "e1",
        "case_study",
        hours_ago(1),
    )
    .with_actor(" Ada@Example.com ")
    .with_company(" Example.COM ")]);
    let service = FourAScoringService::new(store);

    let summary = service.run_at(now(), HOUR).expect("run succeeds");

    assert_eq!(summary, RunSummary { actors: 1, companies: 1 });
    let people = service.store().person_scores();
    assert_eq!(people.len(), 1);
    assert_eq!(
        people.first().map(|row| row.actor_email.as_str()),
        Some("ada@example.com")
    );
    let companies = service.store().company_scores();
    assert_eq!(
        companies.first().map(|row| row.company_domain.as_str()),
        Some("example.com")
    );
}

#[rstest]
fn non_ascii_identities_read_back_as_written(weights: Vec<WeightRow>) {
    let store = MemoryStore::default().with_weights(weights).with_events([Event::new(
        "e1",
        "case_study",
        hours_ago(1),
    )
    .with_actor("ÅSA@x.io")]);
    let service = FourAScoringService::new(store);

    service.run_at(now(), HOUR).expect("run succeeds");

    let row = service
        .store()
        .person_score("ÅSA@x.io", today())
        .expect("memory store never fails")
        .expect("row readable under the original spelling");
    assert_eq!(row.actor_email, "Åsa@x.io");
}

#[rstest]
#[expect(clippy::float_arithmetic, reason = "expected score is computed")]
fn frequency_counts_only_the_trailing_thirty_days(weights: Vec<WeightRow>) {
    let store = MemoryStore::default().with_weights(weights).with_events([
        Event::new("old", "case_study", now() - TimeDelta::days(40))
            .with_actor("ada@example.com")
            .ingested(hours_ago(1)),
        Event::new("new", "case_study", now())
            .with_actor("ada@example.com")
            .ingested(hours_ago(1)),
    ]);
    let service = FourAScoringService::new(store);

    service.run_at(now(), HOUR * 2).expect("run succeeds");

    let row = service
        .store()
        .person_score("ada@example.com", today())
        .expect("memory store never fails")
        .expect("row written");
    let decay_at_forty_days = 0.9_f64.powf(40.0 / 7.0);
    let expected =
        foura_core::round_score(10.0 * (1.0 + 2.0_f64.ln()) * 0.5 * (1.0 + decay_at_forty_days));
    assert!(close(row.person_score, expected), "got {}, expected {expected}", row.person_score);
}

#[rstest]
fn only_recent_ingestions_select_candidates(weights: Vec<WeightRow>) {
    let store = MemoryStore::default().with_weights(weights).with_events([
        Event::new("e1", "case_study", hours_ago(5)).with_actor("old@example.com"),
        Event::new("e2", "case_study", hours_ago(1)).with_actor("new@example.com"),
    ]);
    let service = FourAScoringService::new(store);

    let summary = service.run_at(now(), HOUR * 2).expect("run succeeds");

    assert_eq!(summary.actors, 1);
    let people = service.store().person_scores();
    assert_eq!(people.len(), 1);
    assert_eq!(
        people.first().map(|row| row.actor_email.as_str()),
        Some("new@example.com")
    );
}

#[rstest]
fn interests_boost_matching_events(weights: Vec<WeightRow>) {
    let event = |id: &str, actor: &str| {
        Event::new(id, "case_study", hours_ago(1))
            .with_actor(actor)
            .with_topics(r#"["Security"]"#)
    };
    let store = MemoryStore::default()
        .with_weights(weights)
        .with_interests("ada@example.com", "security, cloud")
        .with_events([event("e1", "ada@example.com"), event("e2", "bob@example.com")]);
    let service = FourAScoringService::new(store);

    service.run_at(now(), HOUR * 2).expect("run succeeds");

    let score = |email: &str| {
        service
            .store()
            .person_score(email, today())
            .expect("memory store never fails")
            .expect("row written")
            .person_score
    };
    assert!(score("ada@example.com") > score("bob@example.com"));
}

#[rstest]
fn storage_failures_abort_the_run(weights: Vec<WeightRow>) {
    let store = MemoryStore::default()
        .with_weights(weights)
        .with_events([Event::new("e1", "case_study", now()).with_actor("ada@example.com")])
        .with_failing_writes();
    let service = FourAScoringService::new(store);

    let err = service.run_at(now(), HOUR).expect_err("writes fail");
    assert!(matches!(err, ScoringError::Store(_)));
}

#[rstest]
fn malformed_weights_abort_the_run() {
    let store = MemoryStore::default()
        .with_weights([WeightRow::new("broken", -5.0, Stage::Attention, "low")])
        .with_events([Event::new("e1", "broken", now()).with_actor("ada@example.com")]);
    let service = FourAScoringService::new(store);

    let err = service.run_at(now(), HOUR).expect_err("weights are invalid");
    assert!(matches!(err, ScoringError::InvalidWeights(_)));
    assert!(service.store().person_scores().is_empty());
}

#[rstest]
fn oversized_windows_are_rejected() {
    let service = FourAScoringService::new(MemoryStore::default());
    let err = service
        .run_at(now(), Duration::MAX)
        .expect_err("window cannot be represented");
    assert!(matches!(err, ScoringError::WindowOutOfRange { .. }));
}

#[rstest]
fn invalid_configuration_is_rejected_up_front() {
    let mut config = ScoringConfig::default();
    config.windows.lookback_days = 0;
    let err = FourAScoringService::with_config(MemoryStore::default(), config)
        .expect_err("zero lookback");
    assert!(matches!(
        err,
        ScoringError::InvalidConfig(ConfigError::ZeroWindow { .. })
    ));
}
