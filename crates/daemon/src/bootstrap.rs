// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Per-credential bootstrap: resolves the Engine (spec §4.6), the Agent
//! Profile (spec §4.7), and assembles the [`SupervisorDeps`] + [`RuntimeConfig`]
//! a [`SupervisorLoop`] needs to start.

use crate::credential::AgentCredential;
use crate::env;
use agentmc_adapters::discovery::{self, DiscoveryMode};
use agentmc_adapters::gateway::{EngineGateway, ProcessGateway};
use agentmc_adapters::profile;
use agentmc_core::{AgentProfile, EngineProvider, RuntimeError, RuntimeErrorKind, SystemClock, TracingErrorSink};
use agentmc_hub::{HttpHubClient, HubApi};
use agentmc_runtime::supervisor::{SupervisorDeps, SupervisorLoop};
use agentmc_runtime::RuntimeConfig;
use std::path::PathBuf;
use std::sync::Arc;

/// One fully-wired, not-yet-running Agent Runtime.
pub struct AgentRuntime {
    pub agent_key_suffix: String,
    pub supervisor: SupervisorLoop<SystemClock>,
}

/// Bootstraps a single Agent Runtime for one credential: resolves the
/// Engine and this agent's profile, then runs the one fail-stop
/// instruction sync that [`SupervisorLoop::bootstrap`] requires.
pub async fn bootstrap_agent(credential: AgentCredential) -> Result<AgentRuntime, RuntimeError> {
    let workspace_dir = agent_workspace_dir(&credential.key_suffix);
    let state_file = workspace_dir.join("agentmc-state.json");

    let hub_base_url = env::hub_base_url().ok_or_else(|| {
        RuntimeError::new(RuntimeErrorKind::Configuration, "bootstrap", "AGENTMC_HUB_BASE_URL is not set")
    })?;

    let config = RuntimeConfig { hub_base_url, ..env::build_config(credential.api_key.clone(), workspace_dir.clone(), state_file) };

    let provider = resolve_engine_provider().await?;
    let engine_agent_token = env::engine_agent_token(&credential.api_key);
    let profile = resolve_agent_profile(&provider, &workspace_dir, &engine_agent_token).await;

    let hub: Arc<dyn HubApi> = Arc::new(HttpHubClient::new(config.hub_base_url.clone(), config.hub_api_key.clone()));
    let gateway: Arc<dyn EngineGateway> = Arc::new(match &provider.kind {
        agentmc_core::EngineKind::External => {
            ProcessGateway::new(env::engine_external_command().unwrap_or_else(|| provider.name.clone()))
        }
        agentmc_core::EngineKind::Embedded => ProcessGateway::new(provider.name.clone()),
    });

    let deps = SupervisorDeps {
        hub,
        gateway,
        engine_agent_token,
        engine_binary: env::engine_binary(),
        session_history_path: env::session_history_path(),
        provider,
        profile,
        error_sink: Arc::new(TracingErrorSink),
    };

    let supervisor = SupervisorLoop::bootstrap(deps, config, SystemClock).await?;
    Ok(AgentRuntime { agent_key_suffix: credential.key_suffix, supervisor })
}

fn agent_workspace_dir(key_suffix: &str) -> PathBuf {
    if key_suffix.is_empty() {
        env::workspace_root()
    } else {
        env::workspace_root().join(key_suffix)
    }
}

async fn resolve_engine_provider() -> Result<EngineProvider, RuntimeError> {
    let mode = match (env::engine_binary(), env::engine_external_command()) {
        (Some(path), _) => DiscoveryMode::Embedded { configured_path: Some(path) },
        (None, Some(command)) => DiscoveryMode::External { command },
        (None, None) => DiscoveryMode::Auto {
            configured_path: None,
            external_command: "agentmc-engine".to_string(),
        },
    };

    discovery::resolve(mode)
        .await
        .map(EngineProvider::dedup_models)
        .filter(EngineProvider::has_models)
        .ok_or_else(|| {
            RuntimeError::new(RuntimeErrorKind::Configuration, "bootstrap", "no Engine with usable models was found")
        })
}

async fn resolve_agent_profile(provider: &EngineProvider, workspace_dir: &std::path::Path, token: &str) -> AgentProfile {
    let rows = profile::discover_rows(&provider.name).await;
    let fallback_name = format!("agent-{token}");
    let row = profile::pick_row(&rows, workspace_dir, token, &fallback_name).cloned();

    let identity_path = workspace_dir.join("IDENTITY.md");
    let identity = profile::parse_identity_file(&identity_path).await;

    build_profile_from_row(&provider.name, row.as_ref(), identity)
}

/// Merges a matched [`profile::DiscoveredRow`] (if any) onto the
/// deterministic fallback profile: the row's `id`/`name`/emoji fields win
/// when present, everything else falls back. Split out from
/// [`resolve_agent_profile`] so the merge logic is testable without a live
/// Engine subprocess.
fn build_profile_from_row(
    provider_name: &str,
    row: Option<&profile::DiscoveredRow>,
    identity: Option<agentmc_core::Identity>,
) -> AgentProfile {
    match row {
        Some(row) => {
            let agent_id = row.raw.get("id").and_then(serde_json::Value::as_i64).unwrap_or(0);
            let mut built = profile::fallback_profile(agent_id, provider_name, identity);
            if let Some(name) = &row.name {
                built.identity.name = name.clone();
            }
            if let Some(emoji) = profile::find_emoji(&row.raw) {
                built.emoji = Some(emoji);
            }
            built
        }
        None => profile::fallback_profile(0, provider_name, identity),
    }
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
