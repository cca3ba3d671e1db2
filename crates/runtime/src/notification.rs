// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Notification bridge: turns a Hub notification signal into a synthetic
//! chat exchange, then marks the notification read on success (spec
//! §4.3.6).

use crate::chat::{ChatOutcome, ChatRunFn, ChatRunInput, RunStatus};
use agentmc_core::{SessionId, TaggedValue};
use agentmc_hub::HubApi;

#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub forward_read_notifications: bool,
    pub type_allowlist: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ReadAndNotForwarded,
    OutsideAllowlist,
}

#[derive(Debug, Clone)]
pub struct NotificationBridgeResult {
    pub request_id: String,
    pub version: Option<String>,
    pub skipped: Option<SkipReason>,
    pub outcome: Option<ChatOutcome>,
    pub marked_read: bool,
}

/// Returns the notification body (possibly nested under `notification`) if
/// `payload` looks notification-shaped, else `None`.
pub fn detect_notification(payload: &TaggedValue) -> Option<&TaggedValue> {
    let shaped = payload.get("notification_type").is_some()
        || payload.get("subject_type").is_some()
        || payload.get("response_action").is_some()
        || payload.get("is_read").is_some();
    if shaped {
        return Some(payload);
    }
    payload.get("notification")
}

/// Strips characters outside `[A-Za-z0-9._-]` so a notification id is safe
/// to embed in a dedupe/request key.
fn safe_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')).collect()
}

fn notification_id_str(body: &TaggedValue) -> Option<String> {
    match body.get("id")? {
        TaggedValue::Text(s) => Some(s.clone()),
        TaggedValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The dedupe-key version component: the first present of
/// `updated_at`/`read_at`/`created_at`, so a re-delivered notification with a
/// fresh timestamp is treated as a new event instead of colliding with a
/// stale dedupe entry.
fn notification_version(body: &TaggedValue) -> Option<String> {
    body.get("updated_at")
        .or_else(|| body.get("read_at"))
        .or_else(|| body.get("created_at"))
        .and_then(TaggedValue::as_str)
        .map(str::to_string)
}

fn build_request_id(body: &TaggedValue, session_id: SessionId, signal_id: u64) -> String {
    match notification_id_str(body) {
        Some(id) => format!("notification-{}", safe_id(&id)),
        None => format!("notification-{session_id}-{signal_id}"),
    }
}

fn build_user_text(body: &TaggedValue) -> String {
    let notification_json = serde_json::to_string_pretty(&body.to_json()).unwrap_or_default();
    let mut text = format!("A notification arrived:\n```json\n{notification_json}\n```");
    if let Some(action) = body.get("response_action").and_then(TaggedValue::as_str) {
        text.push_str(&format!("\n\nRequested response action: {action}"));
    }
    text
}

/// Runs the notification bridge: skip rules, synthetic chat exchange, and
/// Hub acknowledgement on success.
pub async fn bridge_notification(
    hub: &dyn HubApi,
    runner: &dyn ChatRunFn,
    config: &NotificationConfig,
    payload: &TaggedValue,
    session_id: SessionId,
    signal_id: u64,
) -> Option<NotificationBridgeResult> {
    let body = detect_notification(payload)?;

    let is_read = body.get("is_read").and_then(TaggedValue::as_bool).unwrap_or(false);
    if is_read && !config.forward_read_notifications {
        return Some(NotificationBridgeResult {
            request_id: build_request_id(body, session_id, signal_id),
            version: notification_version(body),
            skipped: Some(SkipReason::ReadAndNotForwarded),
            outcome: None,
            marked_read: false,
        });
    }

    if let Some(allowlist) = &config.type_allowlist {
        let notification_type = body.get("notification_type").and_then(TaggedValue::as_str);
        let allowed = notification_type.is_some_and(|t| allowlist.iter().any(|a| a == t));
        if !allowed {
            return Some(NotificationBridgeResult {
                request_id: build_request_id(body, session_id, signal_id),
                version: notification_version(body),
                skipped: Some(SkipReason::OutsideAllowlist),
                outcome: None,
                marked_read: false,
            });
        }
    }

    let request_id = build_request_id(body, session_id, signal_id);
    let version = notification_version(body);
    let user_text = build_user_text(body);

    let outcome = runner
        .run(ChatRunInput { session_id, request_id: request_id.clone(), user_text })
        .await;

    let mut marked_read = false;
    if outcome.status == RunStatus::Ok {
        if let Some(id_str) = notification_id_str(body) {
            if let Ok(id) = id_str.parse::<i64>() {
                marked_read = hub.mark_notification_read(id).await.is_ok();
            }
        }
    }

    Some(NotificationBridgeResult { request_id, version, skipped: None, outcome: Some(outcome), marked_read })
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
