// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Persisted `RuntimeState` cursor file (spec §3, §6): an object, never an
//! array; a missing file is equivalent to an empty state. Patched
//! atomically with a read-merge-write cycle so concurrent sync/heartbeat
//! writers never clobber each other's fields.

use crate::error::StateError;
use agentmc_core::RuntimeState;
use std::path::Path;

/// Loads `RuntimeState` from `path`. A missing file yields the default
/// (empty) state rather than an error.
pub async fn load_state(path: &Path) -> Result<RuntimeState, StateError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str(&raw)
            .map_err(|source| StateError::Decode { path: path.display().to_string(), source }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RuntimeState::default()),
        Err(source) => Err(StateError::Read { path: path.display().to_string(), source }),
    }
}

/// Loads the current state, applies `patch`, and atomically replaces the
/// file via a sibling temp file + rename (never a partial write visible to
/// a concurrent reader).
pub async fn save_state(
    path: &Path,
    patch: impl FnOnce(&mut RuntimeState),
) -> Result<RuntimeState, StateError> {
    let mut state = load_state(path).await?;
    patch(&mut state);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StateError::Write { path: path.display().to_string(), source })?;
    }

    let mut body = serde_json::to_string_pretty(&state)
        .map_err(|source| StateError::Decode { path: path.display().to_string(), source })?;
    body.push('\n');

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, body.as_bytes())
        .await
        .map_err(|source| StateError::Write { path: path.display().to_string(), source })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| StateError::Write { path: path.display().to_string(), source })?;

    Ok(state)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
