use super::*;
use crate::chat::TextSource;
use agentmc_core::{FakeClock, SystemClock, TaggedValue};
use agentmc_hub::fake::FakeHubClient;
use async_trait::async_trait;
use parking_lot::Mutex;

fn signal(id: u64, sender: Sender, payload: serde_json::Value) -> SignalMessage {
    SignalMessage {
        id,
        session_id: SessionId(1),
        sender,
        signal_type: payload.get("type").and_then(|v| v.as_str()).unwrap_or("message").to_string(),
        payload: TaggedValue::from_json(payload),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

#[test]
fn cursors_accept_advances_both_for_non_agent_sender() {
    let mut cursors = WorkerCursors::default();
    assert!(cursors.accept(5, Sender::Browser));
    assert_eq!(cursors.last_signal_id, 5);
    assert_eq!(cursors.last_non_agent_signal_id, 5);
}

#[test]
fn cursors_accept_advances_only_signal_cursor_for_agent_sender() {
    let mut cursors = WorkerCursors { last_signal_id: 3, last_non_agent_signal_id: 3 };
    assert!(cursors.accept(4, Sender::Agent));
    assert_eq!(cursors.last_signal_id, 4);
    assert_eq!(cursors.last_non_agent_signal_id, 3);
}

#[test]
fn cursors_accept_rejects_non_monotonic_id() {
    let mut cursors = WorkerCursors { last_signal_id: 10, last_non_agent_signal_id: 10 };
    assert!(!cursors.accept(10, Sender::Browser));
    assert!(!cursors.accept(5, Sender::Browser));
}

#[test]
fn poll_interval_picks_catch_up_when_connected() {
    let d = poll_interval(false, Duration::from_secs(15), Duration::from_secs(1));
    assert_eq!(d, Duration::from_secs(15));
}

#[test]
fn poll_interval_picks_fallback_when_in_fallback_state() {
    let d = poll_interval(true, Duration::from_secs(15), Duration::from_secs(1));
    assert_eq!(d, Duration::from_secs(1));
}

#[test]
fn classify_inbound_close_signal_always_closes() {
    assert_eq!(classify_inbound("close", Sender::System), InboundAction::Close);
    assert_eq!(classify_inbound("CLOSE", Sender::Browser), InboundAction::Close);
}

#[test]
fn classify_inbound_routes_only_browser_messages() {
    assert_eq!(classify_inbound("message", Sender::Browser), InboundAction::RouteToRequest);
    assert_eq!(classify_inbound("message", Sender::Agent), InboundAction::ObserveOnly);
    assert_eq!(classify_inbound("other", Sender::Browser), InboundAction::ObserveOnly);
}

#[test]
fn connection_observer_distinguishes_first_and_subsequent_connect() {
    let mut observer = ConnectionObserver::default();
    assert_eq!(observer.on_connected(), SnapshotReason::SessionReady);
    assert_eq!(observer.on_connected(), SnapshotReason::Reconnected);
    assert_eq!(observer.on_connected(), SnapshotReason::Reconnected);
}

#[tokio::test]
async fn build_snapshot_payload_includes_hash_per_allowlisted_doc() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("notes.md"), "hello").await.unwrap();

    let allowlist = vec!["notes.md".to_string(), "missing.md".to_string()];
    let payload = build_snapshot_payload(dir.path(), &allowlist, Some("req-1"), SnapshotReason::SessionReady).await;

    assert_eq!(payload.get("type").and_then(TaggedValue::as_str), Some("snapshot.response"));
    assert_eq!(payload.get("reason").and_then(TaggedValue::as_str), Some("session_ready"));
    assert_eq!(payload.get("request_id").and_then(TaggedValue::as_str), Some("req-1"));
    let files = payload.get("files").and_then(TaggedValue::as_array).unwrap();
    assert_eq!(files.len(), 2);
    let notes_hash = files[0].get("base_hash").and_then(TaggedValue::as_str).unwrap();
    assert_eq!(notes_hash, agentmc_core::sha256_hex(b"hello"));
    let missing_hash = files[1].get("base_hash").and_then(TaggedValue::as_str).unwrap();
    assert_eq!(missing_hash, agentmc_core::hash::absent_hash());
}

#[tokio::test]
async fn publish_sends_one_signal_for_a_small_payload() {
    let hub = FakeHubClient::new();
    let payload = serde_json::json!({"request_id": "r1", "content": "hi"});
    publish(&hub, SessionId(3), "chat.agent.done", Some("r1"), &payload).await.unwrap();

    let sent = hub.created_signals.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, SessionId(3));
    assert_eq!(sent[0].1.signal_type, "chat.agent.done");
}

#[tokio::test]
async fn publish_chunks_an_oversized_payload_into_multiple_signals() {
    let hub = FakeHubClient::new();
    let big = "x".repeat(20_000);
    let payload = serde_json::json!({"content": big});
    publish(&hub, SessionId(3), "chat.agent.done", Some("r1"), &payload).await.unwrap();

    let sent = hub.created_signals.lock();
    assert!(sent.len() > 1);
    for (_, req) in sent.iter() {
        assert_eq!(req.signal_type, "chat.agent.done");
        assert!(req.payload.get("chunk_id").is_some());
    }
}

struct ScriptedRunner {
    outcome: Mutex<Option<ChatOutcome>>,
    calls: Mutex<Vec<ChatRunInput>>,
}

impl ScriptedRunner {
    fn new(outcome: ChatOutcome) -> Self {
        Self { outcome: Mutex::new(Some(outcome)), calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl ChatRunFn for ScriptedRunner {
    async fn run(&self, input: ChatRunInput) -> ChatOutcome {
        self.calls.lock().push(input.clone());
        self.outcome.lock().take().unwrap_or(ChatOutcome {
            request_id: input.request_id,
            run_id: "run-x".to_string(),
            status: RunStatus::Ok,
            text_source: TextSource::Fallback,
            content: "Finished with no text.".to_string(),
        })
    }
}

fn chat_context() -> ChatContext {
    ChatContext {
        app: "agentmc".to_string(),
        source: "agentmc-runtime".to_string(),
        intent_scope: "agent_chat".to_string(),
        timezone: None,
        actor_user_id: None,
        default_assignee_user_id: None,
    }
}

fn worker_context<'a>(
    workspace_root: &'a std::path::Path,
    allowlist: &'a [String],
    notification_config: &'a NotificationConfig,
    chat_context: &'a ChatContext,
) -> WorkerContext<'a> {
    WorkerContext {
        session_id: SessionId(1),
        workspace_root,
        managed_doc_id_allowlist: allowlist,
        notification_config,
        chat_context,
        thinking_placeholder: Some("Thinking…"),
    }
}

#[tokio::test]
async fn process_signal_runs_chat_exchange_and_publishes_done() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "req-1".to_string(),
        run_id: "run-1".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "hello back".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(1, Sender::Browser, serde_json::json!({"type": "message", "request_id": "req-1", "content": "hi"}));
    let sink = agentmc_core::TracingErrorSink;
    let outcome = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(outcome, ProcessOutcome::Routed);
    assert_eq!(runner.calls.lock().len(), 1);
    assert!(runner.calls.lock()[0].user_text.contains("[AgentMC Context]"));
    assert!(runner.calls.lock()[0].user_text.contains("hi"));

    let sent = hub.created_signals.lock();
    assert_eq!(sent.len(), 2, "expected a delta then a done frame");
    assert_eq!(sent[0].1.signal_type, "chat.agent.delta");
    assert_eq!(sent[1].1.signal_type, "chat.agent.done");
    assert_eq!(sent[1].1.payload.get("content").and_then(TaggedValue::as_str), Some("hello back"));
}

#[tokio::test]
async fn process_signal_echoes_message_id_on_delta_and_done_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "r1".to_string(),
        run_id: "R".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "Hello.".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(
        10,
        Sender::Browser,
        serde_json::json!({"type": "message", "request_id": "r1", "content": "hi", "message_id": "512"}),
    );
    let sink = agentmc_core::TracingErrorSink;
    let outcome = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(outcome, ProcessOutcome::Routed);
    let sent = hub.created_signals.lock();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1.payload.get("message_id").and_then(TaggedValue::as_str), Some("512"));
    assert_eq!(sent[1].1.payload.get("message_id").and_then(TaggedValue::as_str), Some("512"));
    assert_eq!(sent[1].1.payload.get("content").and_then(TaggedValue::as_str), Some("Hello."));
}

#[tokio::test]
async fn process_signal_omits_message_id_when_absent_from_input() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "r1".to_string(),
        run_id: "R".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "hello back".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(1, Sender::Browser, serde_json::json!({"type": "message", "request_id": "r1", "content": "hi"}));
    let sink = agentmc_core::TracingErrorSink;
    process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    let sent = hub.created_signals.lock();
    assert!(sent[0].1.payload.get("message_id").is_none());
    assert!(sent[1].1.payload.get("message_id").is_none());
}

#[tokio::test]
async fn process_signal_dedupes_repeated_chat_request() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "req-1".to_string(),
        run_id: "run-1".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "hello".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(1, Sender::Browser, serde_json::json!({"type": "message", "request_id": "req-1", "content": "hi"}));
    let sink = agentmc_core::TracingErrorSink;
    let first = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;
    let second = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(first, ProcessOutcome::Routed);
    assert_eq!(second, ProcessOutcome::Deduped);
    assert_eq!(runner.calls.lock().len(), 1);
}

#[tokio::test]
async fn process_signal_treats_empty_content_as_error_without_running_chat() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "unused".to_string(),
        run_id: "unused".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "should not be used".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(1, Sender::Browser, serde_json::json!({"type": "message", "request_id": "req-1", "content": "   "}));
    let sink = agentmc_core::TracingErrorSink;
    let outcome = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(outcome, ProcessOutcome::Routed);
    assert!(runner.calls.lock().is_empty());
    let sent = hub.created_signals.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.payload.get("meta").and_then(|m| m.get("status")).and_then(TaggedValue::as_str), Some("error"));
}

#[tokio::test]
async fn process_signal_close_type_reports_closed() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "unused".to_string(),
        run_id: "unused".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(1, Sender::System, serde_json::json!({"type": "close"}));
    let sink = agentmc_core::TracingErrorSink;
    let outcome = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(outcome, ProcessOutcome::Closed);
}

#[tokio::test]
async fn process_signal_observes_non_browser_non_close_signals() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "unused".to_string(),
        run_id: "unused".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(1, Sender::Agent, serde_json::json!({"type": "message", "content": "echo"}));
    let sink = agentmc_core::TracingErrorSink;
    let outcome = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(outcome, ProcessOutcome::ObservedOnly);
    assert!(hub.created_signals.lock().is_empty());
}

#[tokio::test]
async fn process_signal_bridges_notification_before_routing() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "notification-42".to_string(),
        run_id: "run-1".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "noted".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(5, Sender::System, serde_json::json!({"notification_type": "task_done", "id": 42}));
    let sink = agentmc_core::TracingErrorSink;
    let outcome = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, true, &sink).await;

    assert_eq!(outcome, ProcessOutcome::NotificationBridged);
    assert_eq!(hub.read_notifications.lock().as_slice(), [42]);
    let sent = hub.created_signals.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.signal_type, "chat.agent.done");
}

#[tokio::test]
async fn process_signal_file_save_conflict_publishes_error_frame() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "unused".to_string(),
        run_id: "unused".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec!["notes.md".to_string()];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let sig = signal(
        1,
        Sender::Browser,
        serde_json::json!({
            "type": "file.save",
            "request_id": "req-9",
            "doc_id": "notes.md",
            "base_hash": "wrong-hash",
            "body_markdown": "new body",
        }),
    );
    let sink = agentmc_core::TracingErrorSink;
    let outcome = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(outcome, ProcessOutcome::Routed);
    let sent = hub.created_signals.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.signal_type, "file.save.error");
    assert_eq!(sent[0].1.payload.get("code").and_then(TaggedValue::as_str), Some("conflict"));
}

#[tokio::test]
async fn process_signal_file_save_ok_then_dedupes_retry() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "unused".to_string(),
        run_id: "unused".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec!["notes.md".to_string()];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);

    let absent = agentmc_core::hash::absent_hash();
    let sig = signal(
        1,
        Sender::Browser,
        serde_json::json!({
            "type": "file.save",
            "request_id": "req-9",
            "doc_id": "notes.md",
            "base_hash": absent,
            "body_markdown": "new body",
        }),
    );
    let sink = agentmc_core::TracingErrorSink;
    let first = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;
    let second = process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(first, ProcessOutcome::Routed);
    assert_eq!(second, ProcessOutcome::Routed);
    let sent = hub.created_signals.lock();
    assert_eq!(sent.len(), 1, "retry with the same request_id+doc_id is deduped before reaching the handler");
}

struct CapturingSink {
    errors: Mutex<Vec<RuntimeError>>,
}

impl CapturingSink {
    fn new() -> Self {
        Self { errors: Mutex::new(Vec::new()) }
    }
}

impl ErrorSink for CapturingSink {
    fn report(&self, error: RuntimeError) {
        self.errors.lock().push(error);
    }
}

#[tokio::test]
async fn process_signal_reports_publish_failure_through_error_sink() {
    let dir = tempfile::tempdir().unwrap();
    let hub = FakeHubClient::new();
    hub.create_signal_results.lock().push_back(Err(agentmc_hub::HubError::Transport("down".to_string())));
    let runner = ScriptedRunner::new(ChatOutcome {
        request_id: "req-1".to_string(),
        run_id: "run-1".to_string(),
        status: RunStatus::Ok,
        text_source: TextSource::Wait,
        content: "hello back".to_string(),
    });
    let mut dedupe = ProcessedKeyCache::new(SystemClock, 45_000);
    let allowlist = vec![];
    let config = NotificationConfig::default();
    let context = chat_context();
    let ctx = worker_context(dir.path(), &allowlist, &config, &context);
    let sink = CapturingSink::new();

    let sig = signal(1, Sender::Browser, serde_json::json!({"type": "message", "request_id": "req-1", "content": "hi"}));
    process_signal(&hub, &runner, &mut dedupe, &ctx, &sig, false, &sink).await;

    assert_eq!(sink.errors.lock().len(), 1);
}

#[tokio::test]
async fn run_self_heal_check_closes_session_on_fallback_staleness() {
    let hub = FakeHubClient::new();
    let thresholds =
        SelfHealThresholds { min_age: Duration::from_secs(20), connection_stale: Duration::from_secs(45), activity_stale: Duration::from_secs(120) };
    let sink = agentmc_core::TracingErrorSink;

    let reason = run_self_heal_check(
        &hub, SessionId(1), &thresholds, 100_000, 0, true, "unavailable", 0, 0, &sink,
    )
    .await;

    assert_eq!(reason, Some(SelfHealReason::FallbackStale));
    assert_eq!(hub.closed_sessions.lock().as_slice(), [(SessionId(1), "failed".to_string())]);
}

#[tokio::test]
async fn run_self_heal_check_skips_young_sessions() {
    let hub = FakeHubClient::new();
    let thresholds =
        SelfHealThresholds { min_age: Duration::from_secs(20), connection_stale: Duration::from_secs(45), activity_stale: Duration::from_secs(120) };
    let sink = agentmc_core::TracingErrorSink;

    let reason = run_self_heal_check(&hub, SessionId(1), &thresholds, 5_000, 0, true, "unavailable", 0, 0, &sink).await;

    assert_eq!(reason, None);
    assert!(hub.closed_sessions.lock().is_empty());
}

#[test]
fn fake_clock_is_available_for_future_cursor_tests() {
    let _clock = FakeClock::new();
}
