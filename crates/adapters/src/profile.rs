// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Agent Profile resolution (spec §4.7): discover the Engine's notion of
//! this agent's identity through CLI introspection, local config files,
//! and finally a deterministic fallback.

use agentmc_core::{AgentProfile, Identity};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// One row of engine-reported agent metadata, used for the matching
/// heuristics in `pick_row`.
#[derive(Debug, Clone)]
pub struct DiscoveredRow {
    pub workspace_path: Option<String>,
    pub token: Option<String>,
    pub name: Option<String>,
    pub raw: Value,
}

/// Runs the Engine's agent discovery commands in preference order, each
/// bounded by a 10s timeout. Returns the first nonempty parsed row set.
pub async fn discover_rows(binary: &str) -> Vec<DiscoveredRow> {
    let attempts: Vec<Vec<&str>> = vec![
        vec!["agents", "list", "--json"],
        vec!["gateway", "call", "agents.list", "--json"],
        vec!["gateway", "call", "agents.list", "--json", "--params", "{}"],
        vec!["gateway", "call", "config.get", "--json"],
    ];
    for args in attempts {
        if let Some(rows) = run_discovery_command(binary, &args).await {
            if !rows.is_empty() {
                return rows;
            }
        }
    }
    Vec::new()
}

async fn run_discovery_command(binary: &str, args: &[&str]) -> Option<Vec<DiscoveredRow>> {
    let output = tokio::time::timeout(
        DISCOVERY_TIMEOUT,
        Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .ok()?
    .ok()?;
    if !output.status.success() {
        return None;
    }
    let value: Value = serde_json::from_slice(&output.stdout).ok()?;
    Some(parse_rows(&value))
}

fn parse_rows(value: &Value) -> Vec<DiscoveredRow> {
    let array = if let Some(arr) = value.as_array() {
        arr.clone()
    } else if let Some(arr) = value.get("agents").and_then(Value::as_array) {
        arr.clone()
    } else if value.is_object() {
        vec![value.clone()]
    } else {
        Vec::new()
    };

    array
        .into_iter()
        .map(|row| DiscoveredRow {
            workspace_path: row
                .get("workspace_path")
                .or_else(|| row.get("workspace"))
                .or_else(|| row.get("cwd"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            token: row
                .get("token")
                .or_else(|| row.get("agent_token"))
                .or_else(|| row.get("key"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            name: row.get("name").and_then(Value::as_str).map(str::to_owned),
            raw: row,
        })
        .collect()
}

/// Row-matching heuristics (spec §4.7): exact workspace path match > path
/// containment > normalized token match > normalized name match > single
/// row shortcut.
pub fn pick_row<'a>(rows: &'a [DiscoveredRow], workspace: &Path, token: &str, fallback_name: &str) -> Option<&'a DiscoveredRow> {
    if rows.len() == 1 {
        return rows.first();
    }
    let workspace_str = workspace.to_string_lossy();

    if let Some(row) = rows.iter().find(|r| r.workspace_path.as_deref() == Some(workspace_str.as_ref())) {
        return Some(row);
    }
    if let Some(row) = rows.iter().find(|r| {
        r.workspace_path.as_deref().is_some_and(|p| workspace_str.contains(p) || p.contains(workspace_str.as_ref()))
    }) {
        return Some(row);
    }
    let normalized_token = normalize(token);
    if let Some(row) = rows.iter().find(|r| r.token.as_deref().map(normalize) == Some(normalized_token.clone())) {
        return Some(row);
    }
    let normalized_name = normalize(fallback_name);
    if let Some(row) = rows.iter().find(|r| r.name.as_deref().map(normalize) == Some(normalized_name.clone())) {
        return Some(row);
    }
    None
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

/// Parses `IDENTITY.md` for `Name`, `Creature`, `Vibe` fields (`Key: value`
/// lines, case-insensitive key).
pub async fn parse_identity_file(path: &Path) -> Option<Identity> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    let mut name = None;
    let mut creature = None;
    let mut vibe = None;
    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else { continue };
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(value),
            "creature" => creature = Some(value),
            "vibe" => vibe = Some(value),
            _ => {}
        }
    }
    let name = name?;
    Some(Identity { name, creature, vibe, emoji: None })
}

/// Pulls an emoji from any of the known field names, checking the row
/// itself then a nested `identity`/`profile` object.
pub fn find_emoji(raw: &Value) -> Option<String> {
    const FIELDS: &[&str] = &["emoji", "avatar_emoji", "profile_emoji", "icon_emoji", "icon"];
    for field in FIELDS {
        if let Some(s) = raw.get(field).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    for nested_key in ["identity", "profile"] {
        if let Some(nested) = raw.get(nested_key) {
            if let Some(found) = find_emoji(nested) {
                return Some(found);
            }
        }
    }
    None
}

/// Candidate local config files, in preference order (spec §4.7).
pub fn local_config_candidates(configured_path: Option<&Path>, workspace: &Path, sessions_file: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(p) = configured_path {
        candidates.push(p.to_path_buf());
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".openclaw").join("openclaw.json"));
    }
    candidates.push(workspace.join(".openclaw").join("openclaw.json"));
    if let Some(sessions_file) = sessions_file {
        if let Some(dir) = sessions_file.parent() {
            candidates.push(dir.join("openclaw.json"));
        }
    }
    candidates
}

/// Builds the deterministic fallback profile: `agent-<id>` named, typed by
/// provider, identity parsed from `IDENTITY.md` if present.
pub fn fallback_profile(agent_id: i64, provider_name: &str, identity_file: Option<Identity>) -> AgentProfile {
    let mut profile = AgentProfile::fallback(agent_id, provider_name);
    if let Some(identity) = identity_file {
        profile.emoji = identity.emoji.clone();
        profile.identity = identity;
    }
    profile
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
