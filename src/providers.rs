//! Capability adapters that shell out to configured commands.
//!
//! The generation pipeline and the publishing agent speak differing,
//! evolving protocols; rather than bake a client in, each is reached
//! through a command configured in `notegate.toml` that takes a JSON
//! request on stdin and answers with JSON on stdout. Any HTTP/RPC client
//! wraps trivially in a small script.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::errors::ExternalCallError;
use crate::generation::DraftGenerator;
use crate::item::Draft;
use crate::publish::{PublishReceipt, PublishRequest, Publisher};

async fn run_json_command(
    operation: &'static str,
    command: &str,
    input: &serde_json::Value,
) -> Result<String, ExternalCallError> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ExternalCallError::new(operation, format!("spawn failed: {e}")))?;

    let payload = serde_json::to_vec(input)
        .map_err(|e| ExternalCallError::new(operation, e.to_string()))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(&payload)
            .await
            .map_err(|e| ExternalCallError::new(operation, format!("stdin write failed: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| ExternalCallError::new(operation, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExternalCallError::new(
            operation,
            format!("command exited with {}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Draft generation via an external command.
pub struct CommandGenerator {
    command: String,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl DraftGenerator for CommandGenerator {
    async fn generate_drafts(
        &self,
        keywords: &[String],
        style: &str,
        audience: &str,
    ) -> Result<Vec<Draft>, ExternalCallError> {
        let input = json!({
            "keywords": keywords,
            "style": style,
            "audience": audience,
        });
        let stdout = run_json_command("draft generation", &self.command, &input).await?;
        serde_json::from_str(&stdout).map_err(|e| {
            ExternalCallError::new(
                "draft generation",
                format!("command produced invalid drafts: {e}"),
            )
        })
    }
}

/// Publishing via an external command.
pub struct CommandPublisher {
    command: String,
}

impl CommandPublisher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Publisher for CommandPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, ExternalCallError> {
        let input = serde_json::to_value(request)
            .map_err(|e| ExternalCallError::new("publish", e.to_string()))?;
        let stdout = run_json_command("publish", &self.command, &input).await?;
        serde_json::from_str(&stdout).map_err(|e| {
            ExternalCallError::new("publish", format!("command produced invalid receipt: {e}"))
        })
    }
}

/// Placeholder capability used when no command is configured; every call
/// reports the missing configuration instead of guessing.
pub struct Unconfigured(pub &'static str);

#[async_trait]
impl DraftGenerator for Unconfigured {
    async fn generate_drafts(
        &self,
        _keywords: &[String],
        _style: &str,
        _audience: &str,
    ) -> Result<Vec<Draft>, ExternalCallError> {
        Err(ExternalCallError::new(
            "draft generation",
            format!("no generation command configured (set {})", self.0),
        ))
    }
}

#[async_trait]
impl Publisher for Unconfigured {
    async fn publish(&self, _request: &PublishRequest) -> Result<PublishReceipt, ExternalCallError> {
        Err(ExternalCallError::new(
            "publish",
            format!("no publish command configured (set {})", self.0),
        ))
    }
}
