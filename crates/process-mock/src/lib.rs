//! Scripted command runner for tests.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pgcluster_process::{CommandRunner, Error, Invocation, Output, Result};
use tracing::debug;

/// Something that happened during a test, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A command was run through the mock.
    Command(Invocation),

    /// A free-form marker recorded by another test collaborator.
    Note(String),
}

impl Event {
    /// Short label: `program first-arg` for commands, the text for notes.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Command(invocation) => {
                let mut label = invocation.program().to_string();
                // pg_ctlcluster's action comes third: <version> <cluster> <action>
                let action = if invocation.program() == "pg_ctlcluster" {
                    invocation.arguments().get(2)
                } else {
                    None
                };
                if let Some(action) = action {
                    label.push(' ');
                    label.push_str(&action.to_string_lossy());
                }
                label
            }
            Self::Note(note) => note.clone(),
        }
    }
}

/// Shared, ordered record of events.
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    /// Records a free-form marker.
    pub fn note(&self, note: impl Into<String>) {
        self.0.lock().push(Event::Note(note.into()));
    }

    /// All events so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    /// Labels of all events so far (see [`Event::label`]).
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.0.lock().iter().map(Event::label).collect()
    }

    fn record(&self, invocation: &Invocation) {
        self.0.lock().push(Event::Command(invocation.clone()));
    }
}

enum Response {
    Output(Output),
    SpawnFailure,
}

struct Rule {
    program: String,
    arg: Option<String>,
    response: Response,
}

impl Rule {
    fn matches(&self, invocation: &Invocation) -> bool {
        self.program == invocation.program()
            && self
                .arg
                .as_ref()
                .is_none_or(|arg| invocation.arguments().iter().any(|a| a == arg.as_str()))
    }
}

/// A [`CommandRunner`] that records every invocation and answers from rules.
///
/// Rules match on program name and, optionally, on one argument being present.
/// The most recently added matching rule wins; with no match the command
/// "succeeds" with exit code zero and no output.
#[derive(Clone, Default)]
pub struct MockRunner {
    journal: Journal,
    rules: Arc<Mutex<Vec<Rule>>>,
}

impl MockRunner {
    /// Creates a mock with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose `pg_config --version` prints `version_text`.
    #[must_use]
    pub fn with_pg_config(version_text: &str) -> Self {
        let runner = Self::new();
        runner.respond_stdout("pg_config", Some("--version"), version_text);
        runner
    }

    /// Answers matching invocations with `output`.
    pub fn respond(&self, program: &str, arg: Option<&str>, output: Output) {
        self.rules.lock().push(Rule {
            program: program.to_string(),
            arg: arg.map(str::to_string),
            response: Response::Output(output),
        });
    }

    /// Answers matching invocations with the given exit code.
    pub fn respond_code(&self, program: &str, arg: Option<&str>, code: i32) {
        self.respond(program, arg, Output::with_code(code));
    }

    /// Answers matching invocations with exit code zero and `stdout`.
    pub fn respond_stdout(&self, program: &str, arg: Option<&str>, stdout: &str) {
        let mut output = Output::with_code(0);
        output.stdout = stdout.to_string();
        self.respond(program, arg, output);
    }

    /// Makes matching invocations fail as if the program were not installed.
    pub fn fail_spawn(&self, program: &str) {
        self.rules.lock().push(Rule {
            program: program.to_string(),
            arg: None,
            response: Response::SpawnFailure,
        });
    }

    /// The journal this runner writes to.
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Every invocation run so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.journal
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Command(invocation) => Some(invocation),
                Event::Note(_) => None,
            })
            .collect()
    }

    /// Number of invocations of `program` that carried `arg` (any, if `None`).
    #[must_use]
    pub fn count(&self, program: &str, arg: Option<&str>) -> usize {
        self.invocations()
            .iter()
            .filter(|i| {
                i.program() == program
                    && arg.is_none_or(|arg| i.arguments().iter().any(|a| a == arg))
            })
            .count()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, invocation: &Invocation) -> Result<Output> {
        debug!("mock running: {}", invocation);
        self.journal.record(invocation);

        let rules = self.rules.lock();
        match rules.iter().rev().find(|rule| rule.matches(invocation)) {
            Some(Rule {
                response: Response::Output(output),
                ..
            }) => Ok(output.clone()),
            Some(Rule {
                response: Response::SpawnFailure,
                ..
            }) => Err(Error::Spawn(
                invocation.program().to_string(),
                std::io::ErrorKind::NotFound.into(),
            )),
            None => Ok(Output::with_code(0)),
        }
    }
}
