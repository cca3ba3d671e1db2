// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Centralized `AGENTMC_*` environment variable access (spec §6).

use agentmc_runtime::RuntimeConfig;
use std::path::PathBuf;
use std::time::Duration;

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn var_u64(name: &str) -> Option<u64> {
    var(name).and_then(|s| s.parse().ok())
}

fn var_i64(name: &str) -> Option<i64> {
    var(name).and_then(|s| s.parse().ok())
}

fn var_bool(name: &str) -> Option<bool> {
    var(name).and_then(|s| s.parse().ok())
}

fn var_ms(name: &str) -> Option<Duration> {
    var_u64(name).map(Duration::from_millis)
}

fn var_list(name: &str) -> Option<Vec<String>> {
    var(name).map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
}

/// `AGENTMC_HUB_BASE_URL`, required.
pub fn hub_base_url() -> Option<String> {
    var("AGENTMC_HUB_BASE_URL")
}

/// Workspace root under which per-agent subdirectories are created in
/// multi-agent mode (`AGENTMC_WORKSPACE_ROOT`, default `./workspaces`).
pub fn workspace_root() -> PathBuf {
    var("AGENTMC_WORKSPACE_ROOT").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./workspaces"))
}

/// Engine binary override (`AGENTMC_ENGINE_BINARY`).
pub fn engine_binary() -> Option<PathBuf> {
    var("AGENTMC_ENGINE_BINARY").map(PathBuf::from)
}

/// External engine command override (`AGENTMC_ENGINE_EXTERNAL_COMMAND`).
pub fn engine_external_command() -> Option<String> {
    var("AGENTMC_ENGINE_EXTERNAL_COMMAND")
}

/// Engine session-history store path (`AGENTMC_SESSION_HISTORY_PATH`).
pub fn session_history_path() -> Option<PathBuf> {
    var("AGENTMC_SESSION_HISTORY_PATH").map(PathBuf::from)
}

/// Engine agent token used to key the per-agent session in the Engine
/// Gateway (`AGENTMC_ENGINE_AGENT_TOKEN`); defaults to the agent's Hub API
/// key when unset.
pub fn engine_agent_token(fallback: &str) -> String {
    var("AGENTMC_ENGINE_AGENT_TOKEN").unwrap_or_else(|| fallback.to_string())
}

/// Applies every recognized `AGENTMC_*` override onto a [`RuntimeConfig`]
/// default. `hub_api_key` and `workspace_dir`/`state_file` come from the
/// per-credential scope (see [`crate::credential`]), not from here.
pub fn build_config(hub_api_key: String, workspace_dir: PathBuf, state_file: PathBuf) -> RuntimeConfig {
    let mut config = RuntimeConfig { hub_api_key, workspace_dir, state_file, ..RuntimeConfig::default() };

    if let Some(url) = hub_base_url() {
        config.hub_base_url = url;
    }
    if let Some(id) = var_i64("AGENTMC_AGENT_ID") {
        config.agent_id_override = Some(id);
    }
    if let Some(d) = var_ms("AGENTMC_SESSION_POLL_INTERVAL_MS") {
        config.session_poll_interval = d;
    }
    if let Some(d) = var_ms("AGENTMC_CATCH_UP_POLL_INTERVAL_MS") {
        config.catch_up_poll_interval = d;
    }
    if let Some(d) = var_ms("AGENTMC_FALLBACK_POLL_INTERVAL_MS") {
        config.fallback_poll_interval = d;
    }
    if let Some(d) = var_ms("AGENTMC_RECURRING_POLL_INTERVAL_MS") {
        config.recurring_poll_interval = d;
    }
    if let Some(d) = var_ms("AGENTMC_DEDUPE_TTL_MS") {
        config.dedupe_ttl = d;
    }
    if let Some(d) = var_ms("AGENTMC_SESSION_MIN_AGE_MS") {
        config.session_min_age = d;
    }
    if let Some(d) = var_ms("AGENTMC_CONNECTION_STALE_MS") {
        config.connection_stale_threshold = d;
    }
    if let Some(d) = var_ms("AGENTMC_ACTIVITY_STALE_MS") {
        config.activity_stale_threshold = d;
    }
    if let Some(d) = var_ms("AGENTMC_SUBMIT_TIMEOUT_MS") {
        config.submit_timeout = d;
    }
    if let Some(d) = var_ms("AGENTMC_CHAT_WAIT_TIMEOUT_MS") {
        config.chat_wait_timeout = d;
    }
    if let Some(d) = var_ms("AGENTMC_RECURRING_WAIT_TIMEOUT_MS") {
        config.recurring_wait_timeout = d;
    }
    if let Some(d) = var_ms("AGENTMC_READY_TIMEOUT_MS") {
        config.ready_timeout = d;
    }
    if let Some(b) = var_bool("AGENTMC_CLOSE_SESSION_ON_STOP") {
        config.close_session_on_stop = b;
    }
    if let Some(b) = var_bool("AGENTMC_NOTIFICATIONS_ENABLED") {
        config.notifications_enabled = b;
    }
    if let Some(b) = var_bool("AGENTMC_FORWARD_READ_NOTIFICATIONS") {
        config.forward_read_notifications = b;
    }
    if let Some(list) = var_list("AGENTMC_NOTIFICATION_TYPE_ALLOWLIST") {
        config.notification_type_allowlist = Some(list);
    }
    if let Some(list) = var_list("AGENTMC_MANAGED_DOC_ID_ALLOWLIST") {
        config.managed_doc_id_allowlist = list;
    }
    if let Some(list) = var_list("AGENTMC_PUBLIC_IP_ECHO_ENDPOINTS") {
        config.public_ip_echo_endpoints = list;
    }
    if let Some(fp) = var("AGENTMC_FINGERPRINT_OVERRIDE") {
        config.fingerprint_override = Some(fp);
    }
    if let Some(placeholder) = var("AGENTMC_THINKING_PLACEHOLDER") {
        config.thinking_placeholder = Some(placeholder);
    }
    if let Some(app) = var("AGENTMC_BRIDGE_APP") {
        config.bridge_app = app;
    }
    if let Some(source) = var("AGENTMC_BRIDGE_SOURCE") {
        config.bridge_source = source;
    }
    if let Some(scope) = var("AGENTMC_BRIDGE_INTENT_SCOPE") {
        config.bridge_intent_scope = scope;
    }
    if let Some(tz) = var("AGENTMC_TIMEZONE") {
        config.timezone = Some(tz);
    }
    if let Some(id) = var_i64("AGENTMC_DEFAULT_ASSIGNEE_USER_ID") {
        config.default_assignee_user_id = Some(id);
    }

    config
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
