// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Session and persisted-state types (spec §3, §6).

use crate::SessionId;
use serde::{Deserialize, Serialize};

/// The signed private-channel descriptor returned by `authenticateSocket`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketAuth {
    pub channel: String,
    pub event: String,
    pub key: String,
    pub host: String,
    pub scheme: String,
    pub port: u16,
    pub path: String,
    pub cluster: String,
}

impl SocketAuth {
    /// `wss://host:port/path` (or `ws://` for `scheme == "ws"`), as consumed
    /// by the realtime transport's connector.
    pub fn websocket_url(&self) -> String {
        let scheme = if self.scheme == "https" || self.scheme == "wss" { "wss" } else { "ws" };
        format!("{scheme}://{}:{}{}", self.host, self.port, self.path)
    }
}

/// A Hub-managed session: a pairing of a browser client and an agent, with a
/// signed realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub socket: SocketAuth,
    pub requested_by_user_id: Option<i64>,
    pub status: String,
}

/// Connection state of one Session Worker's realtime transport (spec §4.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Initialized,
    Connecting,
    Connected,
    Unavailable,
    Failed,
    Disconnected,
}

impl ConnectionState {
    /// `unavailable | failed | disconnected` — collectively the fallback
    /// states that fall back to HTTP polling (spec §4.3.1, §4.3.2).
    pub fn is_fallback(self) -> bool {
        matches!(self, ConnectionState::Unavailable | ConnectionState::Failed | ConnectionState::Disconnected)
    }
}

/// Persisted cursor file (spec §3, §6): `{agent_id?, bundle_version?,
/// last_skill_sync_at?, last_heartbeat_at?}`. Missing file ≡ empty state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_skill_sync_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_at: Option<String>,
}
