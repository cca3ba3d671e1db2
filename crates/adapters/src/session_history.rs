// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Engine session-history reader (spec §4.4): a text-only fallback used
//! when a `wait` response carries no direct text field.

use serde_json::Value;
use std::path::Path;

const HIDDEN_KINDS: &[&str] = &["thinking", "reasoning", "analysis", "debug"];

/// Locates `session_key` in the Engine's local sessions store and returns
/// the last assistant-visible text, or `None` if the store, the entry, or
/// any visible text is absent.
pub async fn find_last_visible_text(store_path: &Path, session_key: &str) -> Option<String> {
    let raw = tokio::fs::read_to_string(store_path).await.ok()?;
    let root: Value = serde_json::from_str(&raw).ok()?;
    let entry = locate_entry(&root, session_key)?;

    if let Some(file_ref) = entry.get("sessionFile").and_then(Value::as_str) {
        let jsonl_path = store_path.parent().unwrap_or_else(|| Path::new(".")).join(file_ref);
        return find_last_visible_in_jsonl(&jsonl_path).await;
    }

    let messages = entry
        .get("messages")
        .or_else(|| entry.get("history"))
        .or_else(|| entry.get("events"))
        .and_then(Value::as_array)?;
    last_visible_text(messages.iter().rev())
}

fn locate_entry<'a>(root: &'a Value, session_key: &str) -> Option<&'a Value> {
    if let Some(array) = root.as_array() {
        return array.iter().find(|entry| entry.get("key").and_then(Value::as_str) == Some(session_key));
    }
    if let Some(object) = root.as_object() {
        if let Some(entry) = object.get(session_key) {
            return Some(entry);
        }
        return object.values().find(|entry| entry.get("key").and_then(Value::as_str) == Some(session_key));
    }
    None
}

async fn find_last_visible_in_jsonl(path: &Path) -> Option<String> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    let messages: Vec<Value> = raw.lines().rev().filter_map(|line| serde_json::from_str(line).ok()).collect();
    last_visible_text(messages.iter())
}

fn last_visible_text<'a>(messages: impl Iterator<Item = &'a Value>) -> Option<String> {
    for message in messages {
        if is_hidden(message) {
            continue;
        }
        if let Some(text) = extract_text_field(message) {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn is_hidden(message: &Value) -> bool {
    for field in ["type", "kind", "block_type"] {
        if let Some(value) = message.get(field).and_then(Value::as_str) {
            let lower = value.to_ascii_lowercase();
            if HIDDEN_KINDS.iter().any(|kind| lower.contains(kind)) {
                return true;
            }
        }
    }
    false
}

fn extract_text_field(message: &Value) -> Option<String> {
    for field in ["content", "text", "output_text", "message"] {
        if let Some(s) = message.get(field).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    None
}

#[cfg(test)]
#[path = "session_history_tests.rs"]
mod tests;
