// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Chat execution against the Engine (spec §4.3.5, §4.3.8): the embedded
//! gateway path, the externally-injected run-function path, and reply
//! sanitization shared by both the chat exchange and the notification
//! bridge.

use agentmc_adapters::error::GatewayError;
use agentmc_adapters::gateway::{extract_text, EngineGateway, SubmitRequest, WaitRequest, WaitStatus};
use agentmc_adapters::session_history;
use agentmc_core::SessionId;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ChatRunInput {
    pub session_id: SessionId,
    pub request_id: String,
    pub user_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Timeout,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    Wait,
    SessionHistory,
    Fallback,
    Error,
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub request_id: String,
    pub run_id: String,
    pub status: RunStatus,
    pub text_source: TextSource,
    pub content: String,
}

/// An externally supplied chat runner (spec §4.3.8 "preferred path").
#[async_trait]
pub trait ChatRunFn: Send + Sync {
    async fn run(&self, input: ChatRunInput) -> ChatOutcome;
}

/// Runs the embedded gateway path: submit, wait, then fall back to the
/// session-history reader, then a "finished with no text" fallback.
pub async fn run_chat_embedded(
    gateway: &dyn EngineGateway,
    engine_agent_token: &str,
    session_history_path: Option<&Path>,
    input: ChatRunInput,
    wait_timeout: Duration,
    exec_timeout: Duration,
) -> ChatOutcome {
    let session_key = format!("agent:{engine_agent_token}:agentmc:{}", input.session_id);
    let idempotency_key = format!("agentmc-{}-{}", input.session_id, input.request_id);

    let run_id = match gateway
        .submit(SubmitRequest {
            idempotency_key: idempotency_key.clone(),
            session_key: session_key.clone(),
            message: input.user_text.clone(),
        })
        .await
    {
        Ok(id) => id,
        Err(e) => return error_outcome(input.request_id, idempotency_key, &e),
    };

    let wait_response = match gateway
        .wait(
            WaitRequest { run_id: run_id.clone(), timeout_ms: wait_timeout.as_millis() as u64 },
            exec_timeout,
        )
        .await
    {
        Ok(response) => response,
        Err(e) => return error_outcome(input.request_id, run_id, &e),
    };

    match wait_response.status {
        WaitStatus::Timeout => ChatOutcome {
            request_id: input.request_id,
            run_id,
            status: RunStatus::Timeout,
            text_source: TextSource::Wait,
            content: "Still working…".to_string(),
        },
        WaitStatus::Error => ChatOutcome {
            request_id: input.request_id,
            run_id,
            status: RunStatus::Error,
            text_source: TextSource::Error,
            content: format!("OpenClaw run error: {}", wait_response.error.as_deref().unwrap_or("unknown error")),
        },
        WaitStatus::Ok => {
            if let Some(text) = extract_text(&wait_response.body) {
                return ChatOutcome {
                    request_id: input.request_id,
                    run_id,
                    status: RunStatus::Ok,
                    text_source: TextSource::Wait,
                    content: text,
                };
            }
            if let Some(store) = session_history_path {
                if let Some(text) = session_history::find_last_visible_text(store, &session_key).await {
                    return ChatOutcome {
                        request_id: input.request_id,
                        run_id,
                        status: RunStatus::Ok,
                        text_source: TextSource::SessionHistory,
                        content: text,
                    };
                }
            }
            ChatOutcome {
                request_id: input.request_id,
                run_id,
                status: RunStatus::Ok,
                text_source: TextSource::Fallback,
                content: "Finished with no text.".to_string(),
            }
        }
    }
}

fn error_outcome(request_id: String, run_id: String, error: &GatewayError) -> ChatOutcome {
    ChatOutcome {
        request_id,
        run_id,
        status: RunStatus::Error,
        text_source: TextSource::Error,
        content: format!("OpenClaw run error: {error}"),
    }
}

/// Strips `[[reply_to_current]]`/`[[reply_to:...]]` prefixes, code-fence
/// wrappers, and a leading `assistant:` label from an Engine reply
/// (spec §4.3.5 step 5).
pub fn sanitize_reply(text: &str) -> String {
    let mut s = text.trim();

    loop {
        let stripped = strip_reply_to_marker(s);
        if stripped.len() == s.len() {
            break;
        }
        s = stripped.trim_start();
    }

    if let Some(label_end) = s.find(':') {
        let label = s[..label_end].trim();
        if label.eq_ignore_ascii_case("assistant") {
            s = s[label_end + 1..].trim_start();
        }
    }

    let s = strip_code_fence(s);
    s.trim().to_string()
}

fn strip_reply_to_marker(s: &str) -> &str {
    let trimmed = s.trim_start();
    if let Some(rest) = trimmed.strip_prefix("[[reply_to_current]]") {
        return rest;
    }
    if let Some(rest) = trimmed.strip_prefix("[[reply_to:") {
        if let Some(end) = rest.find("]]") {
            return &rest[end + 2..];
        }
    }
    trimmed
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else { return s };
    let rest = rest.trim_start_matches(|c: char| c.is_alphanumeric());
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim_end_matches('\n')
}

/// Substitutes a status-specific fallback when sanitization leaves an
/// empty string (spec §4.3.5 step 6).
pub fn fallback_for_empty_content(status: &RunStatus) -> &'static str {
    match status {
        RunStatus::Ok => "Finished with no text.",
        RunStatus::Timeout => "Still working…",
        RunStatus::Error => "OpenClaw run error: unknown error",
    }
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
