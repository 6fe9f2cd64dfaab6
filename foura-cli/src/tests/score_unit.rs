//! Unit tests covering score configuration layering and execution.

use std::time::Duration;

use foura_core::store::{ScoreStore, SqliteStore};
use foura_core::Stage;
use foura_scorer::{DEFAULT_WINDOW, HotSincePolicy, RunSummary, ScoringError};
use rstest::rstest;

use super::helpers::{Workspace, fixed_now, target};
use super::*;
use crate::import::{ImportConfig, execute_import};
use crate::score::{ScoreArgs, ScoreConfig, config_from_layers_for_test, execute_score};

#[rstest]
fn score_defaults_match_the_engine() {
    let args = ScoreArgs {
        database: Some("foura.db".into()),
        ..ScoreArgs::default()
    };
    let config = ScoreConfig::try_from(args).expect("config should build");
    assert_eq!(config.window, DEFAULT_WINDOW);
    assert_eq!(config.hot_since, HotSincePolicy::CarryForward);
    assert_eq!(config.target.table_prefix, "");
}

#[rstest]
fn score_without_database_reports_the_env_variable() {
    let err = ScoreConfig::try_from(ScoreArgs::default()).expect_err("database is required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_DATABASE);
            assert_eq!(env, ENV_SCORE_DATABASE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn hot_since_flag_rejects_unknown_policies() {
    let parsed = Cli::try_parse_from([
        "foura",
        "score",
        "--database",
        "foura.db",
        "--hot-since",
        "sometimes",
    ]);
    assert!(parsed.is_err());
}

#[rstest]
fn hot_since_flag_accepts_restamp() {
    let cli = Cli::try_parse_from([
        "foura",
        "score",
        "--database",
        "foura.db",
        "--hot-since",
        "restamp",
    ])
    .expect("valid arguments");
    match cli.command {
        Command::Score(args) => assert_eq!(args.hot_since, Some(HotSincePolicy::Restamp)),
        other => panic!("expected score command, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "window_seconds": "soon" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let workspace = Workspace::new();
    let env_database = workspace.path("from-env.db");
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "database": workspace.path("from-file.db").as_str(),
            "window_seconds": 600,
            "hot_since": "restamp",
            "table_prefix": "file_",
        }),
        None,
    );
    composer.push_environment(json!({
        "database": env_database.as_str(),
    }));
    composer.push_cli(json!({
        "table_prefix": "wp_",
    }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.target.path, env_database);
    assert_eq!(config.target.table_prefix, "wp_");
    assert_eq!(config.window, Duration::from_secs(600));
    assert_eq!(config.hot_since, HotSincePolicy::Restamp);
}

#[rstest]
fn scoring_an_imported_database_writes_todays_rows() {
    let workspace = Workspace::new();
    let (events, weights) = workspace.write_inputs();
    execute_import(
        &ImportConfig {
            target: target(&workspace, ""),
            events: Some(events),
            weights: Some(weights),
        },
        fixed_now(),
    )
    .expect("import fixtures");

    let config = ScoreConfig {
        target: target(&workspace, ""),
        window: DEFAULT_WINDOW,
        hot_since: HotSincePolicy::CarryForward,
    };
    let summary = execute_score(&config, fixed_now()).expect("score run");
    assert_eq!(
        summary,
        RunSummary {
            actors: 1,
            companies: 1
        }
    );

    let store = SqliteStore::open(workspace.database(), "").expect("reopen store");
    let row = store
        .person_score("ada@example.com", fixed_now().date_naive())
        .expect("load person score")
        .expect("row present");
    assert!(row.sql_flag);
    assert_eq!(row.stage, Stage::Acceptance);
    assert_eq!(row.last_touch.as_deref(), Some("demo_request"));
}

#[rstest]
fn scoring_an_uninitialised_database_fails() {
    let workspace = Workspace::new();
    let config = ScoreConfig {
        target: target(&workspace, ""),
        window: DEFAULT_WINDOW,
        hot_since: HotSincePolicy::CarryForward,
    };
    let err = execute_score(&config, fixed_now()).expect_err("tables are missing");
    assert!(matches!(err, CliError::Score(ScoringError::Store(_))));
}
