// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Runtime configuration: the tunables named throughout spec §4, collected
//! into one struct so every component reads from a single source instead
//! of scattering magic numbers. Defaults match the spec's documented
//! values; the `cli`/`daemon` crates populate overrides from `AGENTMC_*`
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub agent_id_override: Option<i64>,
    pub workspace_dir: PathBuf,
    pub state_file: PathBuf,
    pub hub_base_url: String,
    pub hub_api_key: String,

    pub session_poll_interval: Duration,
    pub catch_up_poll_interval: Duration,
    pub fallback_poll_interval: Duration,
    pub recurring_poll_interval: Duration,

    pub dedupe_ttl: Duration,
    pub session_min_age: Duration,
    pub connection_stale_threshold: Duration,
    pub activity_stale_threshold: Duration,

    pub submit_timeout: Duration,
    pub chat_wait_timeout: Duration,
    pub recurring_wait_timeout: Duration,

    pub ready_timeout: Duration,

    pub close_session_on_stop: bool,
    pub notifications_enabled: bool,
    pub forward_read_notifications: bool,
    pub notification_type_allowlist: Option<Vec<String>>,
    pub managed_doc_id_allowlist: Vec<String>,

    pub public_ip_echo_endpoints: Vec<String>,
    pub fingerprint_override: Option<String>,

    pub thinking_placeholder: Option<String>,

    /// `[AgentMC Context]` bridging identifiers (spec §4.3.5 step 4).
    pub bridge_app: String,
    pub bridge_source: String,
    pub bridge_intent_scope: String,
    pub timezone: Option<String>,
    pub default_assignee_user_id: Option<i64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            agent_id_override: None,
            workspace_dir: PathBuf::from("."),
            state_file: PathBuf::from("agentmc-state.json"),
            hub_base_url: String::new(),
            hub_api_key: String::new(),

            session_poll_interval: Duration::from_millis(1200),
            catch_up_poll_interval: Duration::from_secs(15),
            fallback_poll_interval: Duration::from_secs(1),
            recurring_poll_interval: Duration::from_secs(10),

            dedupe_ttl: Duration::from_secs(45),
            session_min_age: Duration::from_secs(20),
            connection_stale_threshold: Duration::from_secs(45),
            activity_stale_threshold: Duration::from_secs(120),

            submit_timeout: Duration::from_secs(30),
            chat_wait_timeout: Duration::from_secs(90),
            recurring_wait_timeout: Duration::from_secs(600),

            ready_timeout: Duration::from_secs(45),

            close_session_on_stop: false,
            notifications_enabled: true,
            forward_read_notifications: false,
            notification_type_allowlist: None,
            managed_doc_id_allowlist: Vec::new(),

            public_ip_echo_endpoints: Vec::new(),
            fingerprint_override: None,

            thinking_placeholder: Some("Thinking…".to_string()),

            bridge_app: "agentmc".to_string(),
            bridge_source: "agentmc-runtime".to_string(),
            bridge_intent_scope: "agent_chat".to_string(),
            timezone: None,
            default_assignee_user_id: None,
        }
    }
}

impl RuntimeConfig {
    /// Exec timeout for a gateway `wait` call: `wait_timeout + 30s` safety
    /// margin (spec §4.3.8, §4.9).
    pub fn gateway_exec_timeout(wait_timeout: Duration) -> Duration {
        wait_timeout + Duration::from_secs(30)
    }

    /// Session Poller 429 backoff: `max(3 * poll_interval, 4s)` (spec §4.2).
    pub fn session_poller_backoff(&self) -> Duration {
        (self.session_poll_interval * 3).max(Duration::from_secs(4))
    }

    /// Signal-poll 429 backoff: `max(2 * fallback_interval, 2.5s)` (spec §4.3.2).
    pub fn signal_poll_backoff(&self) -> Duration {
        (self.fallback_poll_interval * 2).max(Duration::from_millis(2500))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
