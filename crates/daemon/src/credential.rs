// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Multi-agent credential discovery (spec §6): a single `AGENTMC_API_KEY`
//! runs one Agent Runtime; a keyed `AGENTMC_API_KEY_<agent_id>` pattern
//! runs one Agent Runtime per key, each scoped to its own workspace
//! subdirectory.

/// One discovered credential: an API key and the suffix used to derive a
/// per-agent workspace directory and state file name (empty for the
/// single-agent case).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCredential {
    pub key_suffix: String,
    pub api_key: String,
}

const SINGLE_AGENT_VAR: &str = "AGENTMC_API_KEY";
const KEYED_PREFIX: &str = "AGENTMC_API_KEY_";

/// Scans the process environment for credentials. Prefers the keyed
/// multi-agent pattern when any `AGENTMC_API_KEY_<id>` variable is present;
/// otherwise falls back to the single bare `AGENTMC_API_KEY`.
pub fn discover_credentials(vars: impl Iterator<Item = (String, String)>) -> Vec<AgentCredential> {
    let mut keyed = Vec::new();
    let mut single = None;

    for (name, value) in vars {
        if value.is_empty() {
            continue;
        }
        if let Some(suffix) = name.strip_prefix(KEYED_PREFIX) {
            if !suffix.is_empty() {
                keyed.push(AgentCredential { key_suffix: suffix.to_string(), api_key: value });
            }
        } else if name == SINGLE_AGENT_VAR {
            single = Some(AgentCredential { key_suffix: String::new(), api_key: value });
        }
    }

    if !keyed.is_empty() {
        keyed.sort_by(|a, b| a.key_suffix.cmp(&b.key_suffix));
        return keyed;
    }
    single.into_iter().collect()
}

/// Scans the real process environment.
pub fn discover_from_process_env() -> Vec<AgentCredential> {
    discover_credentials(std::env::vars())
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
