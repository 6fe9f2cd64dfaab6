//! Behaviour-driven step definitions driving the `foura` command scenarios.

use std::cell::RefCell;

use foura_scorer::RunSummary;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::helpers::{Workspace, fixed_now};
use super::*;

/// Aggregates command scenario state so each step only needs a single world
/// argument.
#[derive(Debug)]
struct CommandWorld {
    workspace: RefCell<Option<Workspace>>,
    inputs: RefCell<Option<(camino::Utf8PathBuf, camino::Utf8PathBuf)>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl CommandWorld {
    fn new() -> Self {
        Self {
            workspace: RefCell::new(None),
            inputs: RefCell::new(None),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn database(&self) -> String {
        self.workspace
            .borrow()
            .as_ref()
            .expect("workspace created")
            .database()
            .into_string()
    }

    fn invoke(&self, args: &[String]) {
        let mut invocation = vec!["foura".to_owned()];
        invocation.extend(args.iter().cloned());
        self.stdout.borrow_mut().clear();
        let outcome = Cli::try_parse_from(invocation)
            .map_err(CliError::from)
            .and_then(|cli| {
                let mut buffer = self.stdout.borrow_mut();
                dispatch(cli.command, fixed_now(), &mut *buffer)
            });
        self.result.replace(Some(outcome));
    }

    fn assert_succeeded(&self) {
        let borrowed = self.result.borrow();
        let result = borrowed.as_ref().expect("result recorded");
        if let Err(err) = result {
            panic!("expected success, found {err:?}");
        }
    }
}

#[fixture]
fn world() -> CommandWorld {
    CommandWorld::new()
}

#[given("an empty workspace")]
fn empty_workspace(#[from(world)] world: &CommandWorld) {
    world.workspace.replace(Some(Workspace::new()));
}

#[given("event and weight files exist on disk")]
fn inputs_exist(#[from(world)] world: &CommandWorld) {
    let inputs = world
        .workspace
        .borrow()
        .as_ref()
        .expect("workspace created")
        .write_inputs();
    world.inputs.replace(Some(inputs));
}

#[when("I initialise the database")]
fn initialise_database(#[from(world)] world: &CommandWorld) {
    world.invoke(&[
        "init".to_owned(),
        format!("--{ARG_DATABASE}"),
        world.database(),
    ]);
    world.assert_succeeded();
}

#[when("I import the event and weight files")]
fn import_inputs(#[from(world)] world: &CommandWorld) {
    let (events, weights) = world.inputs.borrow().clone().expect("inputs written");
    world.invoke(&[
        "import".to_owned(),
        format!("--{ARG_DATABASE}"),
        world.database(),
        format!("--{ARG_EVENTS}"),
        events.into_string(),
        format!("--{ARG_WEIGHTS}"),
        weights.into_string(),
    ]);
    world.assert_succeeded();
}

#[when("I import without any input files")]
fn import_nothing(#[from(world)] world: &CommandWorld) {
    world.invoke(&[
        "import".to_owned(),
        format!("--{ARG_DATABASE}"),
        world.database(),
    ]);
}

#[when("I run the score command")]
fn run_score(#[from(world)] world: &CommandWorld) {
    world.invoke(&[
        "score".to_owned(),
        format!("--{ARG_DATABASE}"),
        world.database(),
        format!("--{ARG_HOT_SINCE}"),
        "restamp".to_owned(),
    ]);
}

#[when("I run the score command without a database")]
fn run_score_without_database(#[from(world)] world: &CommandWorld) {
    world.invoke(&["score".to_owned()]);
}

#[then("the command succeeds and prints a summary for one actor and one company")]
fn prints_summary(#[from(world)] world: &CommandWorld) {
    world.assert_succeeded();
    let stdout = String::from_utf8(world.stdout.borrow().clone()).expect("stdout utf-8");
    let summary: RunSummary = serde_json::from_str(&stdout).expect("output should be a run summary");
    assert_eq!(
        summary,
        RunSummary {
            actors: 1,
            companies: 1
        }
    );
}

#[then("the command fails because there is nothing to import")]
fn fails_nothing_to_import(#[from(world)] world: &CommandWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingImportInput => {}
        other => panic!("expected MissingImportInput, found {other:?}"),
    }
}

#[then("the command fails because the database path is missing")]
fn fails_missing_database(#[from(world)] world: &CommandWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, env } => {
            assert_eq!(*field, ARG_DATABASE);
            assert_eq!(*env, ENV_SCORE_DATABASE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_command_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/foura_commands.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CommandWorld) {
            let _ = world;
        }
    };
}

register_command_scenario!(import_and_score, "importing and scoring a database");
register_command_scenario!(reject_empty_import, "rejecting an import without inputs");
register_command_scenario!(
    reject_missing_database,
    "rejecting a score run without a database"
);
