//! Model CLI — the single point of entry for all AI calls in this service.
//!
//! ARCHITECTURAL RULE: No other module may spawn the model CLI directly.
//! All model interactions MUST go through `ModelInvoker`.
//!
//! The production implementation shells out to the Claude CLI in print
//! mode with the prompt piped to stdin. Every call is independent and
//! stateless: no retry, no backoff, no circuit breaking — a failed call
//! is terminal for the step that made it.

pub mod json;
pub mod prompts;

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("model CLI exited with {status}: {stderr}")]
    NonZeroExit {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("model query timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("failed to run model CLI: {0}")]
    Process(#[from] std::io::Error),
}

/// Pluggable model capability: prompt in, raw text out.
/// Handlers and the orchestrator depend on this trait so tests can swap
/// in a deterministic double.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn query(&self, prompt: &str, timeout: Duration) -> Result<String, InvokeError>;
}

/// Invokes the `claude` command-line tool as a subprocess.
pub struct ClaudeCli {
    binary: String,
    model: Option<String>,
}

impl ClaudeCli {
    pub fn new(binary: String, model: Option<String>) -> Self {
        Self { binary, model }
    }
}

#[async_trait]
impl ModelInvoker for ClaudeCli {
    async fn query(&self, prompt: &str, limit: Duration) -> Result<String, InvokeError> {
        let mut command = Command::new(&self.binary);
        command.arg("-p").arg("--dangerously-skip-permissions");
        if let Some(model) = &self.model {
            command.arg("--model").arg(model);
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;

        let mut stdin = child.stdin.take().expect("child stdin was piped");
        stdin.write_all(prompt.as_bytes()).await?;
        // Close stdin so the CLI sees EOF and starts responding.
        drop(stdin);

        // Dropping the timed-out future drops the child, which kills it.
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(InvokeError::Timeout(limit)),
        };

        if !output.status.success() {
            return Err(InvokeError::NonZeroExit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(InvokeError::EmptyResponse);
        }

        debug!(bytes = stdout.len(), "model query succeeded");
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_process_error() {
        let cli = ClaudeCli::new("definitely-not-a-real-binary-xyz".to_string(), None);
        let err = cli
            .query("hello", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Process(_)));
    }
}
