//! Argument-list descriptions of external commands and their results.

use std::ffi::{OsStr, OsString};
use std::fmt;

/// A single external command: program, argument list and extra environment.
///
/// Arguments are passed to the program verbatim, never through a shell, so
/// values containing spaces or quotes need no escaping. Arguments and
/// environment values are kept as OS strings, so non-UTF-8 paths survive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
    env: Vec<(String, OsString)>,
}

impl Invocation {
    /// Creates an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<A: AsRef<OsStr>>(mut self, args: impl IntoIterator<Item = A>) -> Self {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Sets an environment variable for this invocation only.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl AsRef<OsStr>) -> Self {
        self.env.push((key.into(), value.as_ref().to_os_string()));
        self
    }

    /// The program to execute.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument list.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Extra environment variables.
    #[must_use]
    pub fn environment(&self) -> &[(String, OsString)] {
        &self.env
    }

    /// Looks up an extra environment variable by name.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Exit code of a finished command. `None` when the process was killed by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitCode(pub Option<i32>);

impl ExitCode {
    /// Exit code zero.
    pub const SUCCESS: Self = Self(Some(0));

    /// Whether the command exited with code zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.0, Some(0))
    }

    /// The numeric code, if any.
    #[must_use]
    pub const fn code(self) -> Option<i32> {
        self.0
    }
}

impl From<std::process::ExitStatus> for ExitCode {
    fn from(status: std::process::ExitStatus) -> Self {
        Self(status.code())
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Captured result of a finished command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    /// How the command exited.
    pub status: ExitCode,

    /// Everything written to stdout.
    pub stdout: String,

    /// Everything written to stderr.
    pub stderr: String,
}

impl Output {
    /// An output with the given code and no captured text.
    #[must_use]
    pub const fn with_code(code: i32) -> Self {
        Self {
            status: ExitCode(Some(code)),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}
