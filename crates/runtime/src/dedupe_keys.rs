// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Dedupe-key construction for the per-session `ProcessedKeyCache`
//! (spec §4.3.3).

/// Chat requests key on `message_id` if present, else `request_id`.
pub fn chat_key(message_id: Option<&str>, request_id: &str) -> String {
    match message_id {
        Some(id) => format!("chat:message:{id}"),
        None => format!("chat:request:{request_id}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Save,
    Delete,
}

impl FileOp {
    fn label(self) -> &'static str {
        match self {
            FileOp::Save => "doc.save",
            FileOp::Delete => "doc.delete",
        }
    }
}

/// `file.save`/`file.delete` key on `doc.save|delete:<request_id>:<doc_id>`.
pub fn file_op_key(op: FileOp, request_id: &str, doc_id: &str) -> String {
    format!("{}:{request_id}:{doc_id}", op.label())
}

/// Notification bridge keys on `notification:id:<id>:v:<version>`, where
/// `version` is the first present of `updated_at`/`read_at`/`created_at`.
/// Falls back to `signal:<signal_id>` when no notification id is present.
pub fn notification_key(
    notification_id: Option<&str>,
    version: Option<&str>,
    signal_id: u64,
) -> String {
    match notification_id {
        Some(id) => format!("notification:id:{id}:v:{}", version.unwrap_or("")),
        None => format!("signal:{signal_id}"),
    }
}

#[cfg(test)]
#[path = "dedupe_keys_tests.rs"]
mod tests;
