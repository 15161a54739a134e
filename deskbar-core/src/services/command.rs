//! Running the command-line helpers without blocking the caller
//!
//! Every helper call is an [`Invocation`] awaited on the tokio reactor, so
//! the GLib main loop keeps running while `nmcli` or `pactl` work. Secrets
//! travel on stdin, never in the argument vector.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{BackendError, BackendResult};

/// Time allowed for a query
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for bringing a connection up
pub const ACTIVATION_TIMEOUT: Duration = Duration::from_secs(120);

/// One helper call
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Binary name, looked up on `PATH`
    pub program: &'static str,
    /// Argument vector
    pub args: Vec<String>,
    /// Written to the child's stdin, then stdin is closed
    pub stdin: Option<String>,
    /// The child is killed once this elapses
    pub timeout: Duration,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Invocation {
    /// A query with [`QUERY_TIMEOUT`] and no stdin
    pub fn new<I, S>(program: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
            timeout: QUERY_TIMEOUT,
        }
    }

    /// Feeds `input` to the child's stdin
    #[must_use]
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Replaces the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the helper and returns trimmed stdout
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Spawn`] if the program cannot be started or
    /// fed, [`BackendError::Timeout`] if it runs too long and
    /// [`BackendError::Failed`] on a non-zero exit.
    pub async fn run(&self) -> BackendResult<String> {
        let spawn_error = |e: std::io::Error| BackendError::Spawn {
            command: self.program,
            reason: e.to_string(),
        };

        let mut child = Command::new(self.program)
            .args(&self.args)
            .env("LC_ALL", "C")
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        if let Some(input) = &self.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin.write_all(input.as_bytes()).await.map_err(spawn_error)?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| BackendError::Timeout {
                command: self.program,
                after: self.timeout,
            })?
            .map_err(spawn_error)?;

        if !output.status.success() {
            return Err(BackendError::Failed {
                command: self.program,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
