// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Recurring-Task Executor: claims due recurring task runs, executes each
//! against the Engine, and reports completion back to the Hub (spec §4.9).

use crate::context_block::bridge_recurring_prompt;
use agentmc_adapters::error::GatewayError;
use agentmc_adapters::gateway::{extract_text, EngineGateway, SubmitRequest, WaitRequest, WaitStatus};
use agentmc_core::{EngineProvider, TaggedValue};
use agentmc_hub::types::{CompleteRecurringTaskRunRequest, DueRecurringTaskRun};
use agentmc_hub::HubApi;
use std::time::Duration;

const SUMMARY_MAX_CHARS: usize = 4000;
const AGENT_RESPONSE_MAX_BYTES: usize = 24_000;

/// True if `run` is claimable by `agent_id`: an absent `agent_id` on the run
/// means any runtime may take it, a present one must match exactly.
pub fn claim_belongs_to_agent(run: &DueRecurringTaskRun, agent_id: i64) -> bool {
    run.agent_id.is_none_or(|id| id == agent_id)
}

/// Collapses runs of whitespace (including newlines) to single spaces, then
/// truncates to at most `max_chars` Unicode scalar values.
fn collapse_and_truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).collect()
}

/// Truncates `text` to at most `max_bytes` bytes, cutting only on a UTF-8
/// character boundary, and reports whether truncation occurred.
fn truncate_utf8_bytes(text: &str, max_bytes: usize) -> (String, bool) {
    if text.len() <= max_bytes {
        return (text.to_string(), false);
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    (text[..end].to_string(), true)
}

#[derive(Debug, Clone)]
pub struct RecurringExecution {
    pub run_id: i64,
    pub status: &'static str,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub runtime_meta: TaggedValue,
}

/// Executes one claimed recurring run against the Engine and builds the
/// completion request, but does not send it — callers that need to retry or
/// batch completions can do so with the result.
pub async fn execute_recurring_run(
    gateway: &dyn EngineGateway,
    engine_agent_token: &str,
    run: &DueRecurringTaskRun,
    skill_refs: &[String],
    provider: &EngineProvider,
    wait_timeout: Duration,
    exec_timeout: Duration,
    started_at: &str,
    finished_at: &str,
) -> RecurringExecution {
    let session_key = format!("agent:{engine_agent_token}:agentmc:recurring:{}", run.task_id);
    let idempotency_key = format!("agentmc-recurring-{}", run.run_id);
    let prompt = bridge_recurring_prompt(&run.task_id.to_string(), skill_refs, &run.prompt);

    let run_id = match gateway
        .submit(SubmitRequest { idempotency_key: idempotency_key.clone(), session_key, message: prompt })
        .await
    {
        Ok(id) => id,
        Err(e) => return error_execution(run, &idempotency_key, provider, started_at, finished_at, &e),
    };

    let wait_response = match gateway
        .wait(WaitRequest { run_id: run_id.clone(), timeout_ms: wait_timeout.as_millis() as u64 }, exec_timeout)
        .await
    {
        Ok(response) => response,
        Err(e) => return error_execution(run, &idempotency_key, provider, started_at, finished_at, &e),
    };

    match wait_response.status {
        WaitStatus::Ok => {
            let text = extract_text(&wait_response.body).unwrap_or_default();
            let summary = collapse_and_truncate(&text, SUMMARY_MAX_CHARS);
            let (stored, truncated) = truncate_utf8_bytes(&text, AGENT_RESPONSE_MAX_BYTES);
            RecurringExecution {
                run_id: run.run_id,
                status: "success",
                summary: Some(summary),
                error_message: None,
                runtime_meta: runtime_meta(
                    &idempotency_key, &run_id, "ok", "wait", provider, run.task_id,
                    started_at, finished_at, &stored, truncated,
                ),
            }
        }
        WaitStatus::Timeout => RecurringExecution {
            run_id: run.run_id,
            status: "error",
            summary: None,
            error_message: Some("run timed out".to_string()),
            runtime_meta: runtime_meta(
                &idempotency_key, &run_id, "timeout", "error", provider, run.task_id,
                started_at, finished_at, "", false,
            ),
        },
        WaitStatus::Error => {
            let message = wait_response.error.unwrap_or_else(|| "unknown error".to_string());
            RecurringExecution {
                run_id: run.run_id,
                status: "error",
                summary: None,
                error_message: Some(message),
                runtime_meta: runtime_meta(
                    &idempotency_key, &run_id, "error", "error", provider, run.task_id,
                    started_at, finished_at, "", false,
                ),
            }
        }
    }
}

fn error_execution(
    run: &DueRecurringTaskRun,
    idempotency_key: &str,
    provider: &EngineProvider,
    started_at: &str,
    finished_at: &str,
    error: &GatewayError,
) -> RecurringExecution {
    RecurringExecution {
        run_id: run.run_id,
        status: "error",
        summary: None,
        error_message: Some(error.to_string()),
        runtime_meta: runtime_meta(
            idempotency_key, "", "error", "error", provider, run.task_id, started_at, finished_at, "", false,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn runtime_meta(
    request_id: &str,
    run_id: &str,
    runtime_status: &str,
    text_source: &str,
    provider: &EngineProvider,
    task_id: i64,
    started_at: &str,
    finished_at: &str,
    agent_response: &str,
    truncated: bool,
) -> TaggedValue {
    TaggedValue::object([
        ("request_id".to_string(), TaggedValue::text(request_id)),
        ("run_id".to_string(), TaggedValue::text(run_id)),
        ("runtime_status".to_string(), TaggedValue::text(runtime_status)),
        ("text_source".to_string(), TaggedValue::text(text_source)),
        (
            "provider".to_string(),
            TaggedValue::object([
                ("name".to_string(), TaggedValue::text(provider.name.clone())),
                ("kind".to_string(), TaggedValue::text(provider_kind_label(provider.kind))),
            ]),
        ),
        ("task_id".to_string(), TaggedValue::Number(serde_json::Number::from(task_id))),
        ("started_at".to_string(), TaggedValue::text(started_at)),
        ("finished_at".to_string(), TaggedValue::text(finished_at)),
        ("agent_response".to_string(), TaggedValue::text(agent_response)),
        ("agent_response_bytes".to_string(), TaggedValue::Number(serde_json::Number::from(agent_response.len()))),
        ("agent_response_truncated".to_string(), TaggedValue::Bool(truncated)),
    ])
}

fn provider_kind_label(kind: agentmc_core::EngineKind) -> &'static str {
    match kind {
        agentmc_core::EngineKind::Embedded => "embedded",
        agentmc_core::EngineKind::External => "external",
    }
}

/// Polls due recurring task runs and executes each sequentially, reporting
/// completion back to the Hub before moving to the next (spec §5: "sequential
/// per poll batch to preserve claim-token semantics").
#[allow(clippy::too_many_arguments)]
pub async fn poll_and_run(
    hub: &dyn HubApi,
    gateway: &dyn EngineGateway,
    engine_agent_token: &str,
    agent_id: i64,
    skill_refs: &[String],
    provider: &EngineProvider,
    limit: u32,
    wait_timeout: Duration,
    started_at: &str,
    finished_at: &str,
) -> Result<usize, agentmc_hub::HubError> {
    let response = hub.list_due_recurring_task_runs(limit).await?;
    let exec_timeout = crate::config::RuntimeConfig::gateway_exec_timeout(wait_timeout);
    let mut completed = 0;
    for run in &response.runs {
        if !claim_belongs_to_agent(run, agent_id) {
            continue;
        }
        let execution = execute_recurring_run(
            gateway,
            engine_agent_token,
            run,
            skill_refs,
            provider,
            wait_timeout,
            exec_timeout,
            started_at,
            finished_at,
        )
        .await;
        hub.complete_recurring_task_run(
            execution.run_id,
            CompleteRecurringTaskRunRequest {
                status: execution.status.to_string(),
                claim_token: run.claim_token.clone(),
                summary: execution.summary,
                error_message: execution.error_message,
                started_at: started_at.to_string(),
                finished_at: finished_at.to_string(),
                runtime_meta: execution.runtime_meta,
            },
        )
        .await?;
        completed += 1;
    }
    Ok(completed)
}

#[cfg(test)]
#[path = "recurring_tests.rs"]
mod tests;
