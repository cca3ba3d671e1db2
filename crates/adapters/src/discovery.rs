// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! EngineProvider resolution (spec §4.6): locate the Engine CLI, probe its
//! version and model list, and decide between the embedded and external
//! execution paths.

use agentmc_core::{EngineKind, EngineProvider};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// How the caller wants the Engine located.
#[derive(Debug, Clone)]
pub enum DiscoveryMode {
    /// Require the embedded CLI; fail if it cannot be found or probed.
    Embedded { configured_path: Option<PathBuf> },
    /// Require an external command; fail if it cannot be probed.
    External { command: String },
    /// Try embedded first, fall through to external on failure.
    Auto { configured_path: Option<PathBuf>, external_command: String },
}

const FALLBACK_PATHS: &[&str] = &["/usr/local/bin/agentmc-engine", "/opt/agentmc/bin/agentmc-engine"];
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(4);

pub async fn resolve(mode: DiscoveryMode) -> Option<EngineProvider> {
    match mode {
        DiscoveryMode::Embedded { configured_path } => resolve_embedded(configured_path.as_deref()).await,
        DiscoveryMode::External { command } => resolve_external(&command).await,
        DiscoveryMode::Auto { configured_path, external_command } => {
            if let Some(provider) = resolve_embedded(configured_path.as_deref()).await {
                return Some(provider);
            }
            resolve_external(&external_command).await
        }
    }
}

async fn resolve_embedded(configured_path: Option<&Path>) -> Option<EngineProvider> {
    let candidate = find_embedded_binary(configured_path).await?;
    let version = probe_version(&candidate).await?;
    let models = probe_models(&candidate).await;
    if models.is_empty() {
        return None;
    }
    Some(EngineProvider {
        kind: EngineKind::Embedded,
        name: "agentmc-engine".into(),
        version,
        build: None,
        mode: "embedded".into(),
        models,
    })
}

async fn resolve_external(command: &str) -> Option<EngineProvider> {
    let version = probe_version(Path::new(command)).await?;
    let models = probe_models(Path::new(command)).await;
    if models.is_empty() {
        return None;
    }
    Some(EngineProvider {
        kind: EngineKind::External,
        name: command.to_string(),
        version,
        build: None,
        mode: "external".into(),
        models,
    })
}

/// Probes configured path, then `PATH` (with platform-specific extension
/// variants), then a fixed fallback list of absolute paths.
async fn find_embedded_binary(configured_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured_path {
        if is_executable(path).await {
            return Some(path.to_path_buf());
        }
    }
    for name in platform_variants("agentmc-engine") {
        if let Some(found) = which(&name) {
            return Some(found);
        }
    }
    for fallback in FALLBACK_PATHS {
        let path = PathBuf::from(fallback);
        if is_executable(&path).await {
            return Some(path);
        }
    }
    None
}

fn platform_variants(base: &str) -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec![format!("{base}.exe"), format!("{base}.cmd"), base.to_string()]
    } else {
        vec![base.to_string()]
    }
}

fn which(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).map(|dir| dir.join(name)).find(|candidate| candidate.is_file())
}

async fn is_executable(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn probe_version(binary: &Path) -> Option<String> {
    let output = tokio::time::timeout(
        VERSION_PROBE_TIMEOUT,
        Command::new(binary)
            .arg("--version")
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
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_line = stdout.lines().find(|l| !l.trim().is_empty())?;
    extract_version(first_line)
}

/// Extracts `N.N(.N)?(-suffix)?` from the first nonempty output line.
fn extract_version(line: &str) -> Option<String> {
    let re = regex::Regex::new(r"\d+\.\d+(?:\.\d+)?(?:-[A-Za-z0-9.]+)?").ok()?;
    re.find(line).map(|m| m.as_str().to_string())
}

async fn probe_models(binary: &Path) -> Vec<String> {
    let output = tokio::time::timeout(
        VERSION_PROBE_TIMEOUT,
        Command::new(binary)
            .arg("models")
            .arg("status")
            .arg("--json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .ok()
    .and_then(Result::ok);

    let Some(output) = output else { return Vec::new() };
    if !output.status.success() {
        return Vec::new();
    }
    let value: serde_json::Value = match serde_json::from_slice(&output.stdout) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let models = value
        .get("models")
        .and_then(|m| m.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m.as_str().map(str::to_owned).or_else(|| {
                    m.get("name").and_then(|n| n.as_str()).map(str::to_owned)
                }))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    dedup_preserve_order(models)
}

fn dedup_preserve_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|m| seen.insert(m.clone())).collect()
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
