// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Managed-file materialization: writes bundle files and session
//! `file.save`/`file.delete` bodies into the workspace, refusing any path
//! that would escape the workspace root, and computing SHA-256 for
//! conflict detection (spec §3 `ManagedFile`, §4.3.7, §4.8).

use crate::error::MaterializeError;
use agentmc_core::hash::{absent_hash, sha256_hex};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MaterializedFile {
    pub path: PathBuf,
    pub base_hash: String,
}

/// Resolves `rel_path` against `workspace_root`, refusing any result whose
/// absolute form does not start with `workspace_root + '/'`.
fn resolve_path(workspace_root: &Path, rel_path: &str) -> Result<PathBuf, MaterializeError> {
    let candidate = workspace_root.join(rel_path);
    let normalized = normalize(&candidate);
    let root_normalized = normalize(workspace_root);
    if !normalized.starts_with(&root_normalized) {
        return Err(MaterializeError::PathEscapesWorkspace(rel_path.to_string()));
    }
    Ok(candidate)
}

/// Lexical normalization (no filesystem access — the file may not exist
/// yet) that collapses `.` and resolves `..` segments.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Writes a bundle file unconditionally (no conflict check — spec §4.8
/// instruction sync always overwrites).
pub async fn materialize_file(
    workspace_root: &Path,
    rel_path: &str,
    content: &str,
) -> Result<MaterializedFile, MaterializeError> {
    let path = resolve_path(workspace_root, rel_path)?;
    write_atomic(&path, content).await?;
    Ok(MaterializedFile { path, base_hash: sha256_hex(content.as_bytes()) })
}

/// Returns the current SHA-256 of `rel_path`, or the empty-body sentinel
/// hash if the file does not exist.
pub async fn current_hash(workspace_root: &Path, rel_path: &str) -> Result<String, MaterializeError> {
    let path = resolve_path(workspace_root, rel_path)?;
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(sha256_hex(&bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(absent_hash()),
        Err(source) => Err(MaterializeError::Io { path: path.display().to_string(), source }),
    }
}

/// `file.save`: writes `body` to `rel_path` if `base_hash` matches the
/// file's current hash (or the absent-file sentinel), re-reading to
/// confirm. Returns the new hash on success.
pub async fn save_managed_file(
    workspace_root: &Path,
    rel_path: &str,
    base_hash: &str,
    body: &str,
) -> Result<MaterializedFile, MaterializeError> {
    let current = current_hash(workspace_root, rel_path).await?;
    if current != base_hash {
        return Err(MaterializeError::Conflict { current_hash: current });
    }
    let path = resolve_path(workspace_root, rel_path)?;
    write_atomic(&path, body).await?;
    let confirmed = tokio::fs::read(&path)
        .await
        .map_err(|source| MaterializeError::Io { path: path.display().to_string(), source })?;
    Ok(MaterializedFile { path, base_hash: sha256_hex(&confirmed) })
}

/// `file.delete`: removes `rel_path` if it exists and `base_hash` matches.
pub async fn remove_file(workspace_root: &Path, rel_path: &str, base_hash: &str) -> Result<(), MaterializeError> {
    let path = resolve_path(workspace_root, rel_path)?;
    let current = current_hash(workspace_root, rel_path).await?;
    if current == absent_hash() {
        return Err(MaterializeError::NotFound(rel_path.to_string()));
    }
    if current != base_hash {
        return Err(MaterializeError::Conflict { current_hash: current });
    }
    tokio::fs::remove_file(&path)
        .await
        .map_err(|source| MaterializeError::Io { path: path.display().to_string(), source })
}

async fn write_atomic(path: &Path, content: &str) -> Result<(), MaterializeError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| MaterializeError::Io { path: path.display().to_string(), source })?;
    }
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, content.as_bytes())
        .await
        .map_err(|source| MaterializeError::Io { path: path.display().to_string(), source })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| MaterializeError::Io { path: path.display().to_string(), source })
}

#[cfg(test)]
#[path = "materializer_tests.rs"]
mod tests;
