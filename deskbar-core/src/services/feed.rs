//! Change notifications from long-running monitors
//!
//! `nmcli monitor` and `pactl subscribe` print a line per event. A
//! [`LineFeed`] turns their stdout into a stream of "something changed"
//! wake-ups, folding a burst of lines into a single one.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use crate::error::{BackendError, BackendResult};

/// Lines arriving closer together than this belong to one burst
pub const BURST_GAP: Duration = Duration::from_millis(80);

/// A source of change wake-ups
#[async_trait(?Send)]
pub trait ChangeFeed {
    /// Waits for the next change. Returns `false` once the source is gone.
    async fn changed(&mut self) -> bool;
}

/// Stdout of a monitor process, filtered line by line
pub struct LineFeed {
    program: &'static str,
    _child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    relevant: fn(&str) -> bool,
}

impl std::fmt::Debug for LineFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineFeed")
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

impl LineFeed {
    /// Starts `program` and watches its stdout; lines for which `relevant`
    /// is false are skipped. The process is killed when the feed is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Spawn`] if the program cannot be started.
    pub fn spawn(
        program: &'static str,
        args: &[&str],
        relevant: fn(&str) -> bool,
    ) -> BackendResult<Self> {
        let spawn_error = |reason: String| BackendError::Spawn {
            command: program,
            reason,
        };
        let mut child = Command::new(program)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout not captured".to_string()))?;
        tracing::debug!(program, "Monitor started");
        Ok(Self {
            program,
            _child: child,
            lines: BufReader::new(stdout).lines(),
            relevant,
        })
    }
}

#[async_trait(?Send)]
impl ChangeFeed for LineFeed {
    async fn changed(&mut self) -> bool {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) if (self.relevant)(&line) => break,
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::debug!(program = self.program, "Monitor exited");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(program = self.program, %e, "Monitor read failed");
                    return false;
                }
            }
        }
        // next_line is cancel safe, so a timed-out read loses nothing
        while let Ok(Ok(Some(_))) = tokio::time::timeout(BURST_GAP, self.lines.next_line()).await {}
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentions_sink(line: &str) -> bool {
        line.contains("sink")
    }

    #[tokio::test]
    async fn test_burst_folds_into_one_change() {
        let mut feed = LineFeed::spawn(
            "sh",
            &["-c", "echo 'on card'; echo 'on sink'; echo 'on sink'; echo 'on sink'"],
            mentions_sink,
        )
        .unwrap();
        assert!(feed.changed().await);
        assert!(!feed.changed().await);
    }

    #[tokio::test]
    async fn test_irrelevant_lines_never_wake() {
        let mut feed = LineFeed::spawn("sh", &["-c", "echo 'on card'; echo 'on source'"], mentions_sink)
            .unwrap();
        assert!(!feed.changed().await);
    }

    #[tokio::test]
    async fn test_separate_bursts() {
        let mut feed = LineFeed::spawn(
            "sh",
            &["-c", "echo 'on sink'; sleep 0.5; echo 'on sink'"],
            mentions_sink,
        )
        .unwrap();
        assert!(feed.changed().await);
        assert!(feed.changed().await);
        assert!(!feed.changed().await);
    }
}
