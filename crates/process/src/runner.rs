//! Running invocations as child processes.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::invocation::{ExitCode, Invocation, Output};

/// Executes external commands.
#[async_trait]
pub trait CommandRunner
where
    Self: Send + Sync + 'static,
{
    /// Runs the invocation to completion and returns its captured output.
    ///
    /// A non-zero exit is not an error; callers inspect [`Output::status`].
    async fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Runs commands on the host with `tokio::process`.
///
/// Each line the child writes is logged with the program name attached and
/// captured into the returned [`Output`].
#[derive(Clone, Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a new `SystemRunner`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

async fn collect_lines<R>(reader: R, program: String, is_stderr: bool) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| Error::Io("failed to read child output", e))?
    {
        if is_stderr {
            warn!(program = %program, "{}", line);
        } else {
            info!(program = %program, "{}", line);
        }
        collected.push_str(&line);
        collected.push('\n');
    }

    Ok(collected)
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<Output> {
        debug!("running: {}", invocation);

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in invocation.environment() {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Spawn(invocation.program().to_string(), e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Io("stdout not captured", std::io::ErrorKind::Other.into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Io("stderr not captured", std::io::ErrorKind::Other.into()))?;

        let (stdout, stderr, status) = tokio::try_join!(
            collect_lines(stdout, invocation.program().to_string(), false),
            collect_lines(stderr, invocation.program().to_string(), true),
            async {
                child
                    .wait()
                    .await
                    .map_err(|e| Error::Io("failed to wait for child", e))
            },
        )?;

        let status: ExitCode = status.into();
        debug!("{} finished with {}", invocation.program(), status);

        Ok(Output {
            status,
            stdout,
            stderr,
        })
    }
}
