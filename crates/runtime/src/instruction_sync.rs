// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Instruction Syncer: fetches the instruction bundle conditionally on the
//! persisted cursor, materializes changed files into the workspace, and
//! persists the new cursor (spec §4.8).

use agentmc_core::RuntimeState;
use agentmc_hub::HubApi;
use agentmc_storage::materializer::materialize_file;
use agentmc_storage::{save_state, StateError};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub changed: bool,
    pub heartbeat_interval_seconds: Option<u64>,
    pub agent_id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("instruction fetch failed: {0}")]
    Hub(#[from] agentmc_hub::HubError),
    #[error("failed writing managed file: {0}")]
    Materialize(#[from] agentmc_storage::MaterializeError),
    #[error("failed persisting runtime state: {0}")]
    State(#[from] StateError),
}

/// Runs one instruction sync: conditional fetch, file materialization, and
/// state-cursor persistence. `now_iso` is the caller-supplied timestamp for
/// `last_skill_sync_at` (kept out of this function so it stays clock-free).
pub async fn sync_instructions(
    hub: &dyn HubApi,
    workspace_root: &Path,
    state_path: &Path,
    now_iso: &str,
) -> Result<SyncOutcome, SyncError> {
    let current = agentmc_storage::load_state(state_path).await?;
    let response = hub.get_instructions(current.bundle_version.as_deref()).await?;

    if response.changed {
        for file in &response.files {
            materialize_file(workspace_root, &file.path, &file.content).await?;
        }
        save_state(state_path, |state: &mut RuntimeState| {
            state.agent_id = Some(response.agent_id);
            state.bundle_version = Some(response.bundle_version.clone());
            state.last_skill_sync_at = Some(now_iso.to_string());
        })
        .await?;
    } else if current.agent_id != Some(response.agent_id) {
        // The Hub can return a new agent_id on an otherwise-unchanged bundle;
        // the stored id always tracks the Hub's latest (open question §9.b).
        save_state(state_path, |state: &mut RuntimeState| {
            state.agent_id = Some(response.agent_id);
        })
        .await?;
    }

    Ok(SyncOutcome {
        changed: response.changed,
        heartbeat_interval_seconds: response.defaults.heartbeat_interval_seconds,
        agent_id: response.agent_id,
    })
}

#[cfg(test)]
#[path = "instruction_sync_tests.rs"]
mod tests;
