use std::fmt;
use std::sync::LazyLock;

use pgcluster_process::{CommandRunner, Invocation};
use regex::Regex;
use tracing::debug;

use crate::error::Error;

/// Matches `PostgreSQL 13.2 (Debian 13.2-1)`, `PostgreSQL 11.11`, ...
static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PostgreSQL\s(?<version>\d+)\.\d+").expect("Invalid regex pattern")
});

/// Major version of the installed PostgreSQL, as used in cluster paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MajorVersion(String);

impl MajorVersion {
    /// Extracts the major version from `pg_config --version` output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionParse`] if the text has no `PostgreSQL MAJOR.MINOR`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        VERSION_REGEX
            .captures(text)
            .and_then(|caps| caps.name("version"))
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| Error::VersionParse(text.trim().to_string()))
    }

    /// Runs `pg_config --version` and parses its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be run, exits unsuccessfully or
    /// prints no recognisable version.
    pub async fn detect(runner: &dyn CommandRunner) -> Result<Self, Error> {
        let invocation = Invocation::new("pg_config").arg("--version");
        let output = runner.run(&invocation).await?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: invocation.to_string(),
                code: output.status,
            });
        }

        let version = Self::parse(&output.stdout)?;
        debug!("detected PostgreSQL major version {}", version);

        Ok(version)
    }

    /// The version as it appears in paths and command lines.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MajorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
