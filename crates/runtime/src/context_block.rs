// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! `[AgentMC Context]` block construction, shared by the chat exchange
//! (spec §4.3.5 step 4) and the recurring-task executor (spec §4.9).

#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub app: String,
    pub source: String,
    pub intent_scope: String,
    pub timezone: Option<String>,
    pub actor_user_id: Option<i64>,
    pub default_assignee_user_id: Option<i64>,
}

/// Prepends an `[AgentMC Context]` block to `user_text` describing the
/// bridging app, source, and routing hints.
pub fn bridge_user_text(context: &ChatContext, user_text: &str) -> String {
    let mut lines = vec!["[AgentMC Context]".to_string()];
    lines.push(format!("app: {}", context.app));
    lines.push(format!("source: {}", context.source));
    lines.push(format!("intent_scope: {}", context.intent_scope));
    if let Some(tz) = &context.timezone {
        lines.push(format!("timezone: {tz}"));
    }
    if let Some(actor) = context.actor_user_id {
        lines.push(format!("actor_user_id: {actor}"));
    }
    if let Some(assignee) = context.default_assignee_user_id {
        lines.push(format!("default_assignee_user_id: {assignee}"));
    }
    format!("{}\n\n{}", lines.join("\n"), user_text)
}

/// Resolves the actor for a chat exchange: payload-supplied actor id,
/// falling back to the session's requester (spec §4.3.5 step 4).
pub fn resolve_actor(payload_actor_id: Option<i64>, session_requester_id: Option<i64>) -> Option<i64> {
    payload_actor_id.or(session_requester_id)
}

const RECURRING_MARKER: &str = "[AgentMC Context]";

/// Prefixes a recurring-task prompt with a context block naming the task
/// scope, unless the prompt already contains one (spec §4.9).
pub fn bridge_recurring_prompt(task_id: &str, skill_refs: &[String], prompt: &str) -> String {
    if prompt.contains(RECURRING_MARKER) {
        return prompt.to_string();
    }
    let mut lines = vec![RECURRING_MARKER.to_string(), "scope: recurring-task".to_string(), format!("task_id: {task_id}")];
    if !skill_refs.is_empty() {
        lines.push(format!("skill_refs: {}", skill_refs.join(", ")));
    }
    format!("{}\n\n{}", lines.join("\n"), prompt)
}

#[cfg(test)]
#[path = "context_block_tests.rs"]
mod tests;
