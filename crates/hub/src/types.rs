// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Request/response DTOs for the Hub REST surface (spec §6).

use agentmc_core::{Session, SignalMessage, SocketAuth, TaggedValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct RequestedSessionsResponse {
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticateSocketRequest {
    pub socket_id: String,
    pub channel_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticateSocketResponse {
    pub auth: SocketAuth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListSignalsResponse {
    pub signals: Vec<SignalMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSignalRequest {
    #[serde(rename = "type")]
    pub signal_type: String,
    pub payload: TaggedValue,
}

/// One managed file entry in an instruction bundle (spec §3 `ManagedFile`,
/// §4.8).
#[derive(Debug, Clone, Deserialize)]
pub struct BundleFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstructionDefaults {
    pub heartbeat_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetInstructionsResponse {
    pub changed: bool,
    pub bundle_version: String,
    #[serde(default)]
    pub files: Vec<BundleFile>,
    pub defaults: InstructionDefaults,
    pub agent_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatRequest {
    pub meta: TaggedValue,
    pub host: TaggedValue,
    pub agent: TaggedValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DueRecurringTaskRun {
    pub run_id: i64,
    pub task_id: i64,
    pub prompt: String,
    pub claim_token: String,
    #[serde(default)]
    pub agent_id: Option<i64>,
    #[serde(default)]
    pub scheduled_for: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListDueRecurringTaskRunsResponse {
    pub runs: Vec<DueRecurringTaskRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteRecurringTaskRunRequest {
    pub status: String,
    pub claim_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: String,
    pub finished_at: String,
    pub runtime_meta: TaggedValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentRow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub workspace_path: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAgentsResponse {
    pub agents: Vec<AgentRow>,
}
