use std::path::PathBuf;

use pgcluster_process::ExitCode;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An external command exited unsuccessfully.
    #[error("`{command}` failed with {code}")]
    CommandFailed {
        /// The command line, for display.
        command: String,

        /// How it exited.
        code: ExitCode,
    },

    /// The database config file exists but could not be read or parsed.
    #[error("failed to load database config {0}: {1}")]
    ConfigLoad(PathBuf, String),

    /// A database or role name cannot be written to `pg_hba.conf`.
    #[error("{0:?} cannot be used in pg_hba.conf")]
    InvalidHbaName(String),

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// An external command could not be run.
    #[error(transparent)]
    Process(#[from] pgcluster_process::Error),

    /// A SQL statement or connection failed.
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),

    /// The cluster did not start.
    #[error("database failed to start at {0}")]
    StartFailed(PathBuf),

    /// The current OS user could not be resolved.
    #[error("could not determine the current user: {0}")]
    UnknownUser(String),

    /// `pg_config --version` printed something unexpected.
    #[error("could not parse a PostgreSQL version from {0:?}")]
    VersionParse(String),

    /// The database config could not be serialized.
    #[error("failed to serialize database config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
