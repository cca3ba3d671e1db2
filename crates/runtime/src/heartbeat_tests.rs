use super::*;
use agentmc_core::{AgentProfile, EngineKind, EngineProvider, Identity};
use agentmc_hub::fake::FakeHubClient;

fn provider(models: Vec<&str>) -> EngineProvider {
    EngineProvider {
        kind: EngineKind::Embedded,
        name: "openclaw".to_string(),
        version: "1.2.3".to_string(),
        build: Some("abc123".to_string()),
        mode: "embedded".to_string(),
        models: models.into_iter().map(str::to_string).collect(),
    }
}

fn profile() -> AgentProfile {
    AgentProfile {
        id: 7,
        name: "agent-7".to_string(),
        kind: "openclaw".to_string(),
        identity: Identity { name: "agent-7".to_string(), creature: None, vibe: None, emoji: None },
        emoji: None,
    }
}

fn inputs<'a>(provider: &'a EngineProvider, profile: &'a AgentProfile) -> HeartbeatInputs<'a> {
    HeartbeatInputs {
        provider,
        profile,
        tool_availability: ToolAvailability::default(),
        fingerprint_override: Some("fixed-fingerprint"),
        public_ip_override: Some("203.0.113.9"),
        ip_echo_endpoints: &[],
        engine_binary: None,
    }
}

#[test]
fn compute_fingerprint_is_deterministic_for_same_inputs() {
    let a = compute_fingerprint("host", "10.0.0.1", "203.0.113.9", "linux", "x86_64");
    let b = compute_fingerprint("host", "10.0.0.1", "203.0.113.9", "linux", "x86_64");
    assert_eq!(a, b);
    let c = compute_fingerprint("host", "10.0.0.2", "203.0.113.9", "linux", "x86_64");
    assert_ne!(a, c);
}

#[test]
fn private_ipv4_classification() {
    assert!(is_private_ipv4("10.1.2.3"));
    assert!(is_private_ipv4("192.168.1.1"));
    assert!(is_private_ipv4("127.0.0.1"));
    assert!(is_private_ipv4("169.254.1.1"));
    assert!(!is_private_ipv4("203.0.113.9"));
    assert!(!is_private_ipv4("not-an-ip"));
}

#[tokio::test]
async fn resolve_public_ip_prefers_explicit_override() {
    let resolved = resolve_public_ip(Some("198.51.100.1"), "10.0.0.1", &[]).await;
    assert_eq!(resolved, "198.51.100.1");
}

#[tokio::test]
async fn resolve_public_ip_short_circuits_on_non_private_local_ip() {
    let resolved = resolve_public_ip(None, "203.0.113.9", &["http://unreachable.invalid".to_string()]).await;
    assert_eq!(resolved, "203.0.113.9");
}

#[tokio::test]
async fn resolve_public_ip_falls_back_to_private_when_no_endpoints_resolve() {
    let resolved = resolve_public_ip(None, "10.0.0.1", &[]).await;
    assert_eq!(resolved, "10.0.0.1");
}

#[test]
fn normalize_models_dedups_preserving_order() {
    let list = json!(["claude-opus", "claude-sonnet", "claude-opus"]);
    let deduped = normalize_models(&list);
    assert_eq!(deduped, json!(["claude-opus", "claude-sonnet"]));
}

#[test]
fn backfill_context_percent_used_is_derived_when_missing() {
    let mut value = json!({"context_used": 50.0, "context_max": 200.0});
    backfill_context_percent_used(&mut value);
    assert_eq!(value.get("context_percent_used").and_then(Value::as_f64), Some(25.0));
}

#[test]
fn backfill_context_percent_used_leaves_existing_value_alone() {
    let mut value = json!({"context_used": 50.0, "context_max": 200.0, "context_percent_used": 10.0});
    backfill_context_percent_used(&mut value);
    assert_eq!(value.get("context_percent_used").and_then(Value::as_f64), Some(10.0));
}

#[test]
fn extract_freetext_telemetry_parses_tokens_line() {
    let line = b"session used 1200 in, 340 out";
    let value = extract_freetext_telemetry(line).expect("should match");
    assert_eq!(value.get("tokens_in").and_then(Value::as_u64), Some(1200));
    assert_eq!(value.get("tokens_out").and_then(Value::as_u64), Some(340));
}

#[test]
fn extract_freetext_telemetry_parses_cache_line() {
    let line = b"cache 82% hit 41 cached 9 new";
    let value = extract_freetext_telemetry(line).expect("should match");
    assert_eq!(value.get("cache_hit_percent").and_then(Value::as_f64), Some(82.0));
    assert_eq!(value.get("cache_hits").and_then(Value::as_u64), Some(41));
    assert_eq!(value.get("cache_new").and_then(Value::as_u64), Some(9));
}

#[test]
fn extract_freetext_telemetry_parses_context_line() {
    let line = b"context 1000/4000 (25%)";
    let value = extract_freetext_telemetry(line).expect("should match");
    assert_eq!(value.get("context_used").and_then(Value::as_f64), Some(1000.0));
    assert_eq!(value.get("context_max").and_then(Value::as_f64), Some(4000.0));
    assert_eq!(value.get("context_percent_used").and_then(Value::as_f64), Some(25.0));
}

#[test]
fn extract_freetext_telemetry_parses_usage_left_and_reset() {
    let line = b"usage 63% left, resets @ 14:30";
    let value = extract_freetext_telemetry(line).expect("should match");
    assert_eq!(value.get("usage_percent_left").and_then(Value::as_f64), Some(63.0));
    assert_eq!(value.get("usage_resets_at").and_then(Value::as_str), Some("14:30"));
}

#[test]
fn extract_freetext_telemetry_returns_none_for_unrelated_text() {
    assert!(extract_freetext_telemetry(b"nothing interesting here").is_none());
}

#[tokio::test]
async fn build_report_fails_when_no_models() {
    let p = provider(vec![]);
    let prof = profile();
    let result = build_report(&inputs(&p, &prof)).await;
    assert!(matches!(result, Err(HeartbeatError::NoModels)));
}

#[tokio::test]
async fn build_report_embeds_fingerprint_and_models() {
    let p = provider(vec!["claude-opus"]);
    let prof = profile();
    let report = build_report(&inputs(&p, &prof)).await.unwrap();
    assert_eq!(report.host.get("fingerprint").and_then(|v| v.as_str()), Some("fixed-fingerprint"));
    let models = report.meta.get("models").and_then(|v| v.as_array()).expect("models present");
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].as_str(), Some("claude-opus"));
    assert_eq!(report.agent.get("id").and_then(|v| v.as_i64()), Some(7));
}

#[tokio::test]
async fn send_heartbeat_advances_last_heartbeat_at_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let hub = FakeHubClient::new();
    let p = provider(vec!["claude-opus"]);
    let prof = profile();

    send_heartbeat(&hub, &state_path, &inputs(&p, &prof), "2026-01-01T00:00:00Z").await.unwrap();

    assert_eq!(hub.heartbeats_sent.lock().len(), 1);
    let state = agentmc_storage::load_state(&state_path).await.unwrap();
    assert_eq!(state.last_heartbeat_at, Some("2026-01-01T00:00:00Z".to_string()));
}

#[tokio::test]
async fn send_heartbeat_does_not_advance_timestamp_when_no_models() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let hub = FakeHubClient::new();
    let p = provider(vec![]);
    let prof = profile();

    let result = send_heartbeat(&hub, &state_path, &inputs(&p, &prof), "2026-01-01T00:00:00Z").await;
    assert!(result.is_err());
    assert_eq!(hub.heartbeats_sent.lock().len(), 0);

    let state = agentmc_storage::load_state(&state_path).await.unwrap();
    assert_eq!(state.last_heartbeat_at, None);
}
