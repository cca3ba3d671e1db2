// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! `external.run`: the non-gateway chat execution path for an externally
//! configured Engine command (spec §4.6).

use agentmc_core::SessionId;
use serde::Serialize;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone, Serialize)]
struct ExternalInput {
    session_id: SessionId,
    request_id: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct ExternalRunResult {
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExternalRunError {
    #[error("external command failed to spawn: {0}")]
    SpawnFailed(String),
    #[error("external command timed out")]
    Timeout,
    #[error("external command exited with status {0}")]
    NonZeroExit(i32),
}

/// Execs `command --agentmc-input <json>`. Parses stdout as JSON with a
/// `content|output|text` field, or falls back to the raw trimmed stdout.
pub async fn run(
    command: &str,
    session_id: SessionId,
    request_id: &str,
    message: &str,
    timeout: Duration,
) -> Result<ExternalRunResult, ExternalRunError> {
    let input = ExternalInput {
        session_id,
        request_id: request_id.to_string(),
        message: message.to_string(),
    };
    let input_json = serde_json::to_string(&input).unwrap_or_default();

    let mut cmd = Command::new(command);
    cmd.arg("--agentmc-input")
        .arg(&input_json)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| ExternalRunError::Timeout)?
        .map_err(|e| ExternalRunError::SpawnFailed(e.to_string()))?;

    if !output.status.success() {
        return Err(ExternalRunError::NonZeroExit(output.status.code().unwrap_or(-1)));
    }

    Ok(ExternalRunResult { content: parse_output(&output.stdout) })
}

fn parse_output(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        for key in ["content", "output", "text"] {
            if let Some(s) = value.get(key).and_then(Value::as_str) {
                return s.to_string();
            }
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
#[path = "external_tests.rs"]
mod tests;
