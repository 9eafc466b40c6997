// src/exec/command.rs

//! Bounded external calls (`qsub`, `qstat`).

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `program args..` to completion, giving up after `limit`.
///
/// The child is killed if the deadline passes. A timeout is reported as an
/// error; callers decide whether that is fatal.
pub async fn run_with_timeout<I, S>(program: &str, args: I, limit: Duration) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program, ?limit, "running external command");

    let output = tokio::time::timeout(limit, cmd.output())
        .await
        .map_err(|_| anyhow!("'{program}' timed out after {}s", limit.as_secs()))?
        .with_context(|| format!("running '{program}'"))?;

    Ok(CommandOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
