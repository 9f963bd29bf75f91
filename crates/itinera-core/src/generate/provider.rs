//! The `GenerationProvider` trait and the `claude` CLI implementation.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Something that answers a prompt with free text.
///
/// Object-safe so it can be held as `Arc<dyn GenerationProvider>`.
/// Implementations should not retry; the caller owns the deadline.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short name used in logs (e.g. "claude-cli").
    fn name(&self) -> &str;

    /// Send `prompt` and return the raw answer.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn GenerationProvider) {}
};

/// Runs `claude -p <prompt>` and returns its stdout.
///
/// The child is spawned with `kill_on_drop`, so a caller that abandons the
/// future (for instance on timeout) also reclaims the process.
#[derive(Debug, Clone)]
pub struct ClaudeCliProvider {
    /// Path to the `claude` binary. Defaults to `"claude"` (found via `$PATH`).
    binary: String,
    model: Option<String>,
}

impl ClaudeCliProvider {
    pub fn new() -> Self {
        Self::with_binary("claude")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            model: None,
        }
    }

    /// Pass `--model <model>` on every call.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-p").arg("--output-format").arg("text");
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }
        cmd.arg(prompt);
        cmd.stdin(std::process::Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }
}

impl Default for ClaudeCliProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for ClaudeCliProvider {
    fn name(&self) -> &str {
        "claude-cli"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(binary = %self.binary, prompt_len = prompt.len(), "invoking claude");

        let output = self.command(prompt).output().await.with_context(|| {
            format!(
                "failed to spawn claude binary at '{}' -- is it installed and on PATH?",
                self.binary
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("claude exited with {}: {}", output.status, stderr.trim());
        }

        String::from_utf8(output.stdout).context("claude output is not valid UTF-8")
    }
}
