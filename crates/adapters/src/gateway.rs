// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Engine Gateway: wraps the Engine subprocess CLI with two RPCs,
//! `submit` and `wait` (spec §2.2, §4.3.8).

use crate::error::GatewayError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::Instrument;

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub idempotency_key: String,
    pub session_key: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct WaitRequest {
    pub run_id: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStatus {
    Ok,
    Timeout,
    Error,
}

#[derive(Debug, Clone)]
pub struct WaitResponse {
    pub status: WaitStatus,
    /// Raw JSON body so the caller can search `content > output_text > text > message > response`.
    pub body: Value,
    pub error: Option<String>,
}

/// Engine Gateway RPCs. Exactly two — `submit` and `wait` — per the system overview.
#[async_trait]
pub trait EngineGateway: Send + Sync {
    async fn submit(&self, request: SubmitRequest) -> Result<String, GatewayError>;
    async fn wait(&self, request: WaitRequest, exec_timeout: Duration) -> Result<WaitResponse, GatewayError>;
}

/// Subprocess-backed gateway: invokes a configured CLI binary, piping JSON
/// in on argv and parsing JSON out of stdout (spec §2.2 "parses single or
/// trailing-line JSON").
pub struct ProcessGateway {
    command: String,
    extra_args: Vec<String>,
}

impl ProcessGateway {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), extra_args: Vec::new() }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    async fn run_json(
        &self,
        subcommand: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.extra_args)
            .arg(subcommand)
            .arg("--json")
            .arg(payload.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let span = tracing::info_span!("gateway_exec", command = %self.command, subcommand);
        let output = tokio::time::timeout(timeout, cmd.output())
            .instrument(span)
            .await
            .map_err(|_| GatewayError::Timeout(timeout))?
            .map_err(|e| GatewayError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(GatewayError::NonZeroExit {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        parse_trailing_json(&output.stdout)
            .ok_or_else(|| GatewayError::Decode(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

#[async_trait]
impl EngineGateway for ProcessGateway {
    async fn submit(&self, request: SubmitRequest) -> Result<String, GatewayError> {
        let payload = serde_json::json!({
            "idempotencyKey": request.idempotency_key,
            "sessionKey": request.session_key,
            "message": request.message,
        });
        let body = self.run_json("submit", &payload, Duration::from_secs(30)).await?;
        Ok(body
            .get("run_id")
            .or_else(|| body.get("runId"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or(request.idempotency_key))
    }

    async fn wait(&self, request: WaitRequest, exec_timeout: Duration) -> Result<WaitResponse, GatewayError> {
        let payload = serde_json::json!({
            "runId": request.run_id,
            "timeoutMs": request.timeout_ms,
        });
        let body = self.run_json("wait", &payload, exec_timeout).await?;
        let status = match body.get("status").and_then(Value::as_str) {
            Some("ok") => WaitStatus::Ok,
            Some("timeout") => WaitStatus::Timeout,
            _ => WaitStatus::Error,
        };
        let error = body.get("error").and_then(Value::as_str).map(str::to_owned);
        Ok(WaitResponse { status, body, error })
    }
}

/// Parses a JSON value from `bytes`, trying the whole buffer first and
/// falling back to the last nonempty line (engines that emit log chatter
/// before a final JSON line).
fn parse_trailing_json(bytes: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(bytes);
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }
    text.lines().rev().find_map(|line| {
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            serde_json::from_str::<Value>(line).ok()
        }
    })
}

/// Searches a wait-response body for the first present text field in the
/// spec's preference order (§4.3.8 step 4).
pub fn extract_text(body: &Value) -> Option<String> {
    for key in ["content", "output_text", "text", "message", "response"] {
        if let Some(s) = body.get(key).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s.to_owned());
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
