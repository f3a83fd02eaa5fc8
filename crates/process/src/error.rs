//! Error types for command execution.

use std::io;

use thiserror::Error;

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running external commands.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error while talking to a child process.
    #[error("io error: {0} - {1}")]
    Io(&'static str, #[source] io::Error),

    /// The program could not be started at all.
    #[error("failed to spawn {0}: {1}")]
    Spawn(String, #[source] io::Error),
}
