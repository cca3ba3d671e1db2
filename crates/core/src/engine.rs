// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! `EngineProvider` / `AgentProfile` — the types resolved once at bootstrap
//! (spec §4.6, §4.7) and refreshed before every heartbeat.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Embedded,
    External,
}

/// Describes the local Engine: which binary runs it, what it calls itself,
/// and which models it exposes. `models` must be non-empty whenever a
/// heartbeat is built (spec §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineProvider {
    pub kind: EngineKind,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    pub mode: String,
    pub models: Vec<String>,
}

impl EngineProvider {
    /// Normalizes `models` to a unique, order-preserving set, matching the
    /// heartbeat composition rule in spec §4.5.
    pub fn dedup_models(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.models.retain(|m| seen.insert(m.clone()));
        self
    }

    pub fn has_models(&self) -> bool {
        !self.models.is_empty()
    }
}

/// The agent's discovered identity, re-resolved before every heartbeat
/// (spec §3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl AgentProfile {
    pub fn fallback(agent_id: i64, provider_name: &str) -> Self {
        let name = format!("agent-{agent_id}");
        Self {
            id: agent_id,
            name: name.clone(),
            kind: provider_name.to_string(),
            identity: Identity { name, creature: None, vibe: None, emoji: None },
            emoji: None,
        }
    }
}
