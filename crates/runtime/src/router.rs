// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Request router: dispatches an inbound signal on `payload.type`
//! case-insensitively (spec §4.3.4).

use agentmc_core::TaggedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    ChatExchange,
    SnapshotRequest,
    FileSave,
    FileDelete,
    Unhandled,
}

/// Routes a signal payload by its `type` field. Only `sender == browser`
/// `type == message` signals reach this — callers enforce that filter
/// before calling (spec §4.3.3 step 5).
pub fn route(payload: &TaggedValue) -> RouteTarget {
    let Some(channel_type) = payload.get("type").and_then(TaggedValue::as_str) else {
        return RouteTarget::Unhandled;
    };
    match channel_type.to_ascii_lowercase().as_str() {
        "chat.user" | "chat.request" => RouteTarget::ChatExchange,
        "snapshot.request" => RouteTarget::SnapshotRequest,
        "file.save" => RouteTarget::FileSave,
        "file.delete" => RouteTarget::FileDelete,
        _ => RouteTarget::Unhandled,
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
