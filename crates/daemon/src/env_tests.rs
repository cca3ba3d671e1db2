use super::*;
use serial_test::serial;

fn clear_all() {
    for (key, _) in std::env::vars() {
        if key.starts_with("AGENTMC_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn build_config_applies_overrides_onto_defaults() {
    clear_all();
    std::env::set_var("AGENTMC_HUB_BASE_URL", "https://hub.example.com");
    std::env::set_var("AGENTMC_AGENT_ID", "42");
    std::env::set_var("AGENTMC_CHAT_WAIT_TIMEOUT_MS", "5000");
    std::env::set_var("AGENTMC_CLOSE_SESSION_ON_STOP", "true");
    std::env::set_var("AGENTMC_MANAGED_DOC_ID_ALLOWLIST", "AGENTS.md, notes.md");

    let config = build_config("tok".to_string(), PathBuf::from("/tmp/ws"), PathBuf::from("/tmp/state.json"));

    assert_eq!(config.hub_base_url, "https://hub.example.com");
    assert_eq!(config.hub_api_key, "tok");
    assert_eq!(config.agent_id_override, Some(42));
    assert_eq!(config.chat_wait_timeout, Duration::from_millis(5000));
    assert!(config.close_session_on_stop);
    assert_eq!(config.managed_doc_id_allowlist, vec!["AGENTS.md".to_string(), "notes.md".to_string()]);

    clear_all();
}

#[test]
#[serial]
fn build_config_leaves_defaults_when_unset() {
    clear_all();
    let config = build_config("tok".to_string(), PathBuf::from("/tmp/ws"), PathBuf::from("/tmp/state.json"));
    let defaults = RuntimeConfig::default();

    assert_eq!(config.session_poll_interval, defaults.session_poll_interval);
    assert_eq!(config.notifications_enabled, defaults.notifications_enabled);
    assert_eq!(config.bridge_app, defaults.bridge_app);
}

#[test]
#[serial]
fn engine_agent_token_falls_back_to_hub_key_when_unset() {
    clear_all();
    assert_eq!(engine_agent_token("hub-key"), "hub-key");

    std::env::set_var("AGENTMC_ENGINE_AGENT_TOKEN", "engine-tok");
    assert_eq!(engine_agent_token("hub-key"), "engine-tok");
    clear_all();
}
