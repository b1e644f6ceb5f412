//! External tool invocation port.
//!
//! Adapters that shell out (the YouTube adapter's yt-dlp calls) go through
//! [`ToolRunner`] instead of spawning processes directly, so tests can
//! substitute a fake invoker and never touch a real subprocess.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{ExtractError, Result};

/// Captured result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external tool with a bounded timeout and captures its output.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args`, waiting at most `timeout`.
    ///
    /// A missing executable maps to [`ExtractError::DependencyMissing`]; a
    /// timeout or spawn failure maps to [`ExtractError::SourceUnavailable`].
    /// A nonzero exit is not an error at this layer; callers decide whether
    /// that is fatal.
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<ToolOutput>;
}

/// Production runner backed by `tokio::process`.
pub struct CommandRunner;

#[async_trait]
impl ToolRunner for CommandRunner {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<ToolOutput> {
        let invocation = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, invocation)
            .await
            .map_err(|_| {
                ExtractError::unavailable(
                    program,
                    format!("timed out after {}s", timeout.as_secs()),
                )
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::dependency(
                        program,
                        format!("install {} and ensure it is on PATH", program),
                    )
                } else {
                    ExtractError::unavailable(program, format!("failed to spawn: {}", e))
                }
            })?;

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
