use super::*;
use agentmc_adapters::fake::FakeGateway;
use agentmc_core::{FakeClock, Identity, SocketAuth};
use agentmc_hub::fake::FakeHubClient;
use agentmc_hub::types::{AuthenticateSocketResponse, GetInstructionsResponse, InstructionDefaults};
use std::sync::Arc;

fn provider() -> EngineProvider {
    EngineProvider {
        kind: agentmc_core::EngineKind::Embedded,
        name: "agentmc-engine".to_string(),
        version: "1.0.0".to_string(),
        build: None,
        mode: "embedded".to_string(),
        models: vec!["model-a".to_string()],
    }
}

fn profile() -> AgentProfile {
    AgentProfile {
        id: 7,
        name: "agent-7".to_string(),
        kind: "embedded".to_string(),
        identity: Identity { name: "agent-7".to_string(), creature: None, vibe: None, emoji: None },
        emoji: None,
    }
}

fn deps(hub: Arc<FakeHubClient>, gateway: Arc<FakeGateway>) -> SupervisorDeps {
    SupervisorDeps {
        hub,
        gateway,
        engine_agent_token: "tok".to_string(),
        engine_binary: None,
        session_history_path: None,
        provider: provider(),
        profile: profile(),
        error_sink: Arc::new(agentmc_core::TracingErrorSink),
    }
}

fn socket_auth() -> SocketAuth {
    SocketAuth {
        channel: "private-session-1".to_string(),
        event: "signal".to_string(),
        key: "key".to_string(),
        host: "hub.example.com".to_string(),
        scheme: "https".to_string(),
        port: 443,
        path: "/ws".to_string(),
        cluster: "mt1".to_string(),
    }
}

#[test]
fn sleep_duration_picks_the_sooner_deadline() {
    assert_eq!(sleep_duration(1_000, 5_000, 2_000), Duration::from_millis(1_000));
    assert_eq!(sleep_duration(1_000, 1_050, 1_080), MIN_TICK);
}

#[test]
fn sleep_duration_never_spins_below_min_tick() {
    assert_eq!(sleep_duration(5_000, 1_000, 2_000), MIN_TICK);
}

#[test]
fn due_helpers_trigger_at_or_past_deadline() {
    assert!(!is_heartbeat_due(999, 1_000));
    assert!(is_heartbeat_due(1_000, 1_000));
    assert!(is_heartbeat_due(1_001, 1_000));
    assert!(!is_recurring_due(999, 1_000));
    assert!(is_recurring_due(1_000, 1_000));
}

#[test]
fn tool_availability_reflects_config() {
    let mut config = RuntimeConfig::default();
    config.managed_doc_id_allowlist = vec!["readme".to_string()];
    config.notifications_enabled = true;
    let availability = tool_availability(&config);
    assert!(availability.chat_realtime);
    assert!(availability.files_realtime);
    assert!(availability.notifications_realtime);

    config.managed_doc_id_allowlist.clear();
    config.notifications_enabled = false;
    let availability = tool_availability(&config);
    assert!(!availability.files_realtime);
    assert!(!availability.notifications_realtime);
}

#[tokio::test]
async fn bootstrap_fails_when_hub_reports_no_heartbeat_interval() {
    let hub = Arc::new(FakeHubClient::new());
    hub.instructions.lock().push_back(Ok(GetInstructionsResponse {
        changed: true,
        bundle_version: "bundle-1".to_string(),
        files: vec![],
        defaults: InstructionDefaults { heartbeat_interval_seconds: None },
        agent_id: 7,
    }));
    let gateway = Arc::new(FakeGateway::new());

    let result = SupervisorLoop::bootstrap(deps(hub, gateway), RuntimeConfig::default(), FakeClock::new()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn bootstrap_succeeds_and_captures_heartbeat_interval() {
    let hub = Arc::new(FakeHubClient::new());
    hub.instructions.lock().push_back(Ok(GetInstructionsResponse {
        changed: false,
        bundle_version: "bundle-1".to_string(),
        files: vec![],
        defaults: InstructionDefaults { heartbeat_interval_seconds: Some(30) },
        agent_id: 7,
    }));
    let gateway = Arc::new(FakeGateway::new());

    let supervisor =
        SupervisorLoop::bootstrap(deps(hub, gateway), RuntimeConfig::default(), FakeClock::new()).await.unwrap();
    assert_eq!(supervisor.heartbeat_interval_ms, 30_000);
    assert_eq!(supervisor.agent_id, 7);
}

#[tokio::test]
async fn spawn_worker_skips_when_claim_fails() {
    // FakeHubClient's claim_session always succeeds, so exercise the
    // authenticate_socket failure path instead: no queued auth response
    // means the fake returns an error and no worker should be spawned.
    let hub = Arc::new(FakeHubClient::new());
    hub.instructions.lock().push_back(Ok(GetInstructionsResponse {
        changed: false,
        bundle_version: "bundle-1".to_string(),
        files: vec![],
        defaults: InstructionDefaults { heartbeat_interval_seconds: Some(30) },
        agent_id: 7,
    }));
    let gateway = Arc::new(FakeGateway::new());
    let mut supervisor =
        SupervisorLoop::bootstrap(deps(hub, gateway), RuntimeConfig::default(), FakeClock::new()).await.unwrap();

    let session =
        Session { id: agentmc_core::SessionId(1), socket: socket_auth(), requested_by_user_id: None, status: "requested".to_string() };
    supervisor.spawn_worker(session).await;
    assert!(supervisor.workers.is_empty());
}

#[tokio::test]
async fn spawn_worker_starts_a_worker_on_successful_handshake() {
    let hub = Arc::new(FakeHubClient::new());
    hub.instructions.lock().push_back(Ok(GetInstructionsResponse {
        changed: false,
        bundle_version: "bundle-1".to_string(),
        files: vec![],
        defaults: InstructionDefaults { heartbeat_interval_seconds: Some(30) },
        agent_id: 7,
    }));
    *hub.auth_response.lock() = Some(Ok(AuthenticateSocketResponse { auth: socket_auth() }));
    let gateway = Arc::new(FakeGateway::new());
    let mut supervisor =
        SupervisorLoop::bootstrap(deps(hub.clone(), gateway), RuntimeConfig::default(), FakeClock::new()).await.unwrap();

    let session =
        Session { id: agentmc_core::SessionId(9), socket: socket_auth(), requested_by_user_id: Some(42), status: "requested".to_string() };
    supervisor.spawn_worker(session).await;

    assert_eq!(supervisor.workers.len(), 1);
    assert_eq!(supervisor.workers[0].session_id, agentmc_core::SessionId(9));

    supervisor.stop_workers().await;
    assert!(supervisor.workers.is_empty());
}

#[tokio::test]
async fn stop_workers_closes_sessions_when_configured() {
    let hub = Arc::new(FakeHubClient::new());
    hub.instructions.lock().push_back(Ok(GetInstructionsResponse {
        changed: false,
        bundle_version: "bundle-1".to_string(),
        files: vec![],
        defaults: InstructionDefaults { heartbeat_interval_seconds: Some(30) },
        agent_id: 7,
    }));
    *hub.auth_response.lock() = Some(Ok(AuthenticateSocketResponse { auth: socket_auth() }));
    let gateway = Arc::new(FakeGateway::new());
    let mut config = RuntimeConfig::default();
    config.close_session_on_stop = true;
    let mut supervisor = SupervisorLoop::bootstrap(deps(hub.clone(), gateway), config, FakeClock::new()).await.unwrap();

    let session =
        Session { id: agentmc_core::SessionId(3), socket: socket_auth(), requested_by_user_id: None, status: "requested".to_string() };
    supervisor.spawn_worker(session).await;
    supervisor.stop_workers().await;

    let closed = hub.closed_sessions.lock();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].0, agentmc_core::SessionId(3));
}
