// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Session Worker: the per-session state machine combining a websocket
//! consumer, an HTTP-fallback poller, the request router, and the
//! self-heal timer (spec §4.3).
//!
//! The live websocket connect/read loop (`run`) is, like the teacher's
//! `event_bridge`, not itself unit-tested — only the pure decision
//! functions it calls are. Startup failure of the socket never panics the
//! worker; it falls back to HTTP polling.

use crate::chat::{sanitize_reply, ChatOutcome, ChatRunFn, ChatRunInput, RunStatus, TextSource};
use crate::context_block::{bridge_user_text, resolve_actor, ChatContext};
use crate::dedupe_keys::{chat_key, file_op_key, notification_key, FileOp};
use crate::managed_files::{handle_file_delete, handle_file_save, FileDeleteRequest, FileSaveRequest};
use crate::notification::{bridge_notification, NotificationBridgeResult, NotificationConfig};
use crate::router::{route, RouteTarget};
use crate::self_heal::{self, SelfHealReason, SelfHealThresholds};
use agentmc_core::dedupe::ProcessedKeyCache;
use agentmc_core::{Clock, ErrorSink, RuntimeError, RuntimeErrorKind, Sender, SessionId, SignalMessage, TaggedValue};
use agentmc_hub::types::CreateSignalRequest;
use agentmc_hub::HubApi;
use std::path::Path;
use std::time::Duration;

/// The two cursors a worker tracks (spec §4.3.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerCursors {
    pub last_signal_id: u64,
    pub last_non_agent_signal_id: u64,
}

impl WorkerCursors {
    /// Advances both cursors for a monotonic signal id; `last_non_agent_signal_id`
    /// only advances for non-agent senders. Returns `false` (and leaves the
    /// cursors untouched) for an id at-or-behind `last_signal_id`.
    pub fn accept(&mut self, signal_id: u64, sender: Sender) -> bool {
        if signal_id <= self.last_signal_id {
            return false;
        }
        self.last_signal_id = signal_id;
        if !sender.is_agent() {
            self.last_non_agent_signal_id = signal_id;
        }
        true
    }
}

/// Polling cadence for the HTTP fallback poller (spec §4.3.2).
pub fn poll_interval(in_fallback_state: bool, catch_up_interval: Duration, fallback_interval: Duration) -> Duration {
    if in_fallback_state {
        fallback_interval
    } else {
        catch_up_interval
    }
}

/// What an accepted inbound signal should do next (spec §4.3.3 step 4-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundAction {
    Close,
    RouteToRequest,
    ObserveOnly,
}

/// Classifies an inbound signal per spec §4.3.3: `close` signals close the
/// worker; only `browser`-sent `message` signals reach the router; anything
/// else is observed but not routed.
pub fn classify_inbound(signal_type: &str, sender: Sender) -> InboundAction {
    if signal_type.eq_ignore_ascii_case("close") {
        return InboundAction::Close;
    }
    if sender == Sender::Browser && signal_type.eq_ignore_ascii_case("message") {
        return InboundAction::RouteToRequest;
    }
    InboundAction::ObserveOnly
}

/// A reason tag for a `snapshot.response` frame (spec §4.3.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotReason {
    SessionReady,
    Reconnected,
}

impl SnapshotReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotReason::SessionReady => "session_ready",
            SnapshotReason::Reconnected => "reconnected",
        }
    }
}

/// Tracks `connected` transitions to distinguish the first connect
/// (`session_ready`) from every subsequent one (`reconnected`), per
/// spec §4.3.11.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionObserver {
    connected_before: bool,
}

impl ConnectionObserver {
    pub fn on_connected(&mut self) -> SnapshotReason {
        let reason = if self.connected_before { SnapshotReason::Reconnected } else { SnapshotReason::SessionReady };
        self.connected_before = true;
        reason
    }
}

/// Builds the `snapshot.response` payload: the managed-file set, each doc's
/// current hash (spec §4.3.4 `snapshot.request` handler).
pub async fn build_snapshot_payload(
    workspace_root: &Path,
    allowlist: &[String],
    request_id: Option<&str>,
    reason: SnapshotReason,
) -> TaggedValue {
    let mut files = Vec::with_capacity(allowlist.len());
    for doc_id in allowlist {
        let hash = agentmc_storage::materializer::current_hash(workspace_root, doc_id)
            .await
            .unwrap_or_else(|_| agentmc_core::hash::absent_hash());
        files.push(TaggedValue::object([
            ("doc_id".to_string(), TaggedValue::text(doc_id.clone())),
            ("base_hash".to_string(), TaggedValue::text(hash)),
        ]));
    }
    let mut entries = vec![
        ("type".to_string(), TaggedValue::text("snapshot.response")),
        ("reason".to_string(), TaggedValue::text(reason.as_str())),
        ("files".to_string(), TaggedValue::Array(files)),
    ];
    if let Some(id) = request_id {
        entries.push(("request_id".to_string(), TaggedValue::text(id)));
    }
    TaggedValue::object(entries)
}

/// Publishes an outbound envelope via the Hub's signal-trigger endpoint,
/// chunking it first if it exceeds the transport's size budgets (spec
/// §4.3.10). All outbound traffic goes through `createSignal`: the realtime
/// transport here is receive-only, matching the signed-channel/trigger-API
/// split implied by `SocketAuth`.
pub async fn publish(
    hub: &dyn HubApi,
    session_id: SessionId,
    channel_type: &str,
    request_id: Option<&str>,
    payload: &serde_json::Value,
) -> Result<(), agentmc_hub::HubError> {
    let envelopes = agentmc_adapters::transport::chunk_payload(channel_type, request_id, payload)
        .map_err(|e| agentmc_hub::HubError::Transport(e.to_string()))?;
    for envelope in envelopes {
        let signal_type = envelope
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(channel_type)
            .to_string();
        let envelope_payload = envelope.get("payload").cloned().unwrap_or(envelope.clone());
        hub.create_signal(
            session_id,
            CreateSignalRequest { signal_type, payload: TaggedValue::from_json(envelope_payload) },
        )
        .await?;
    }
    Ok(())
}

/// Configuration bundle for a single session's `process_signal` call.
pub struct WorkerContext<'a> {
    pub session_id: SessionId,
    pub workspace_root: &'a Path,
    pub managed_doc_id_allowlist: &'a [String],
    pub notification_config: &'a NotificationConfig,
    pub chat_context: &'a ChatContext,
    pub thinking_placeholder: Option<&'a str>,
}

/// Result of processing one inbound signal, surfaced for logging/tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Closed,
    Deduped,
    Routed,
    NotificationBridged,
    ObservedOnly,
}

/// Runs the full inbound-signal pipeline (spec §4.3.3-§4.3.7): cursor
/// acceptance is the caller's job (the caller owns `WorkerCursors` across
/// many signals); this handles dedupe, notification bridging, close
/// handling, and request routing for one already-accepted signal.
#[allow(clippy::too_many_arguments)]
pub async fn process_signal<C: Clock>(
    hub: &dyn HubApi,
    runner: &dyn ChatRunFn,
    dedupe: &mut ProcessedKeyCache<C>,
    ctx: &WorkerContext<'_>,
    signal: &SignalMessage,
    notifications_enabled: bool,
    error_sink: &dyn ErrorSink,
) -> ProcessOutcome {
    if notifications_enabled {
        if let Some(result) = bridge_notification(
            hub,
            runner,
            ctx.notification_config,
            &signal.payload,
            ctx.session_id,
            signal.id,
        )
        .await
        {
            return finish_notification_bridge(hub, ctx, signal, result, dedupe, error_sink).await;
        }
    }

    match classify_inbound(&signal.signal_type, signal.sender) {
        InboundAction::Close => {
            ProcessOutcome::Closed
        }
        InboundAction::ObserveOnly => ProcessOutcome::ObservedOnly,
        InboundAction::RouteToRequest => {
            route_request(hub, runner, dedupe, ctx, signal, error_sink).await
        }
    }
}

fn report_publish_failure(error_sink: &dyn ErrorSink, channel_type: &str, err: agentmc_hub::HubError) {
    error_sink.report(RuntimeError::new(
        RuntimeErrorKind::TransientNetwork,
        "session_worker",
        format!("publish({channel_type}) failed: {err}"),
    ));
}

async fn finish_notification_bridge<C: Clock>(
    hub: &dyn HubApi,
    ctx: &WorkerContext<'_>,
    signal: &SignalMessage,
    result: NotificationBridgeResult,
    dedupe: &mut ProcessedKeyCache<C>,
    error_sink: &dyn ErrorSink,
) -> ProcessOutcome {
    let key = notification_key(Some(&result.request_id), result.version.as_deref(), signal.id);
    if dedupe.check_and_mark(&key) {
        return ProcessOutcome::Deduped;
    }
    if let Some(outcome) = &result.outcome {
        if let Err(e) = publish(
            hub,
            ctx.session_id,
            "chat.agent.done",
            Some(&outcome.request_id),
            &done_payload(outcome, signal.id, None),
        )
        .await
        {
            report_publish_failure(error_sink, "chat.agent.done", e);
        }
    }
    ProcessOutcome::NotificationBridged
}

async fn route_request<C: Clock>(
    hub: &dyn HubApi,
    runner: &dyn ChatRunFn,
    dedupe: &mut ProcessedKeyCache<C>,
    ctx: &WorkerContext<'_>,
    signal: &SignalMessage,
    error_sink: &dyn ErrorSink,
) -> ProcessOutcome {
    match route(&signal.payload) {
        RouteTarget::ChatExchange => run_chat_exchange(hub, runner, dedupe, ctx, signal, error_sink).await,
        RouteTarget::SnapshotRequest => {
            let request_id = signal.payload.get("request_id").and_then(TaggedValue::as_str);
            let payload = build_snapshot_payload(
                ctx.workspace_root,
                ctx.managed_doc_id_allowlist,
                request_id,
                SnapshotReason::Reconnected,
            )
            .await;
            if let Err(e) = publish(hub, ctx.session_id, "snapshot.response", request_id, &payload.to_json()).await {
                report_publish_failure(error_sink, "snapshot.response", e);
            }
            ProcessOutcome::Routed
        }
        RouteTarget::FileSave => {
            run_file_save(hub, ctx, signal, dedupe, error_sink).await;
            ProcessOutcome::Routed
        }
        RouteTarget::FileDelete => {
            run_file_delete(hub, ctx, signal, dedupe, error_sink).await;
            ProcessOutcome::Routed
        }
        RouteTarget::Unhandled => ProcessOutcome::ObservedOnly,
    }
}

async fn run_chat_exchange<C: Clock>(
    hub: &dyn HubApi,
    runner: &dyn ChatRunFn,
    dedupe: &mut ProcessedKeyCache<C>,
    ctx: &WorkerContext<'_>,
    signal: &SignalMessage,
    error_sink: &dyn ErrorSink,
) -> ProcessOutcome {
    let payload = &signal.payload;
    let request_id = payload
        .get("request_id")
        .and_then(TaggedValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(agentmc_core::new_request_id);
    let message_id = payload.get("message_id").and_then(TaggedValue::as_str);

    let key = chat_key(message_id, &request_id);
    if dedupe.check_and_mark(&key) {
        return ProcessOutcome::Deduped;
    }

    let raw_text = payload
        .get("content")
        .or_else(|| payload.get("message"))
        .and_then(TaggedValue::as_str)
        .unwrap_or("");

    if raw_text.trim().is_empty() {
        let outcome = ChatOutcome {
            request_id: request_id.clone(),
            run_id: request_id.clone(),
            status: RunStatus::Error,
            text_source: TextSource::Error,
            content: "Received an empty message.".to_string(),
        };
        if let Err(e) = publish(
            hub,
            ctx.session_id,
            "chat.agent.done",
            Some(&request_id),
            &done_payload(&outcome, signal.id, message_id),
        )
        .await
        {
            report_publish_failure(error_sink, "chat.agent.done", e);
        }
        return ProcessOutcome::Routed;
    }

    if let Some(placeholder) = ctx.thinking_placeholder {
        let mut fields = vec![
            ("type".to_string(), TaggedValue::text("chat.agent.delta")),
            ("request_id".to_string(), TaggedValue::text(request_id.clone())),
            ("content".to_string(), TaggedValue::text(placeholder)),
        ];
        if let Some(id) = message_id {
            fields.push(("message_id".to_string(), TaggedValue::text(id)));
        }
        let delta = TaggedValue::object(fields);
        if let Err(e) = publish(hub, ctx.session_id, "chat.agent.delta", Some(&request_id), &delta.to_json()).await {
            report_publish_failure(error_sink, "chat.agent.delta", e);
        }
    }

    let actor_user_id = resolve_actor(
        payload.get("actor_user_id").and_then(TaggedValue::as_i64),
        ctx.chat_context.actor_user_id,
    );
    let mut context = ctx.chat_context.clone();
    context.actor_user_id = actor_user_id;
    let user_text = bridge_user_text(&context, raw_text);

    let outcome = runner
        .run(ChatRunInput { session_id: ctx.session_id, request_id: request_id.clone(), user_text })
        .await;

    if let Err(e) = publish(
        hub,
        ctx.session_id,
        "chat.agent.done",
        Some(&request_id),
        &done_payload(&outcome, signal.id, message_id),
    )
    .await
    {
        report_publish_failure(error_sink, "chat.agent.done", e);
    }
    ProcessOutcome::Routed
}

fn done_payload(outcome: &ChatOutcome, signal_id: u64, message_id: Option<&str>) -> serde_json::Value {
    let sanitized = sanitize_reply(&outcome.content);
    let content = if sanitized.is_empty() {
        crate::chat::fallback_for_empty_content(&outcome.status).to_string()
    } else {
        sanitized
    };
    let mut payload = serde_json::json!({
        "type": "chat.agent.done",
        "request_id": outcome.request_id,
        "content": content,
        "meta": {
            "run_id": outcome.run_id,
            "status": status_label(&outcome.status),
            "text_source": text_source_label(&outcome.text_source),
            "signal_id": signal_id,
        },
    });
    if let Some(id) = message_id {
        payload["message_id"] = serde_json::Value::from(id);
    }
    payload
}

fn status_label(status: &RunStatus) -> &'static str {
    match status {
        RunStatus::Ok => "ok",
        RunStatus::Timeout => "timeout",
        RunStatus::Error => "error",
    }
}

fn text_source_label(source: &TextSource) -> &'static str {
    match source {
        TextSource::Wait => "wait",
        TextSource::SessionHistory => "session_history",
        TextSource::Fallback => "fallback",
        TextSource::Error => "error",
    }
}

async fn run_file_save<C: Clock>(
    hub: &dyn HubApi,
    ctx: &WorkerContext<'_>,
    signal: &SignalMessage,
    dedupe: &mut ProcessedKeyCache<C>,
    error_sink: &dyn ErrorSink,
) {
    let payload = &signal.payload;
    let request_id = payload.get("request_id").and_then(TaggedValue::as_str).map(str::to_string);
    let doc_id = payload.get("doc_id").and_then(TaggedValue::as_str).unwrap_or("").to_string();
    if let Some(id) = &request_id {
        if dedupe.check_and_mark(&file_op_key(FileOp::Save, id, &doc_id)) {
            return;
        }
    }

    let request = FileSaveRequest {
        request_id,
        doc_id,
        base_hash: payload.get("base_hash").and_then(TaggedValue::as_str).unwrap_or("").to_string(),
        title: payload.get("title").and_then(TaggedValue::as_str).map(str::to_string),
        body_markdown: payload.get("body_markdown").and_then(TaggedValue::as_str).unwrap_or("").to_string(),
    };

    match handle_file_save(ctx.workspace_root, ctx.managed_doc_id_allowlist, request).await {
        Ok(ok) => {
            let body = serde_json::json!({
                "type": "file.save.ok",
                "request_id": ok.request_id,
                "doc_id": ok.doc_id,
                "base_hash": ok.base_hash,
                "title": ok.title,
            });
            if let Err(e) = publish(hub, ctx.session_id, "file.save.ok", Some(&ok.request_id), &body).await {
                report_publish_failure(error_sink, "file.save.ok", e);
            }
        }
        Err((request_id, error)) => {
            let body = serde_json::json!({
                "type": "file.save.error",
                "request_id": request_id,
                "code": error.code(),
                "current_hash": error.current_hash(),
            });
            if let Err(e) = publish(hub, ctx.session_id, "file.save.error", Some(&request_id), &body).await {
                report_publish_failure(error_sink, "file.save.error", e);
            }
        }
    }
}

async fn run_file_delete<C: Clock>(
    hub: &dyn HubApi,
    ctx: &WorkerContext<'_>,
    signal: &SignalMessage,
    dedupe: &mut ProcessedKeyCache<C>,
    error_sink: &dyn ErrorSink,
) {
    let payload = &signal.payload;
    let request_id = payload.get("request_id").and_then(TaggedValue::as_str).map(str::to_string);
    let doc_id = payload.get("doc_id").and_then(TaggedValue::as_str).unwrap_or("").to_string();
    if let Some(id) = &request_id {
        if dedupe.check_and_mark(&file_op_key(FileOp::Delete, id, &doc_id)) {
            return;
        }
    }

    let request = FileDeleteRequest {
        request_id,
        doc_id,
        base_hash: payload.get("base_hash").and_then(TaggedValue::as_str).unwrap_or("").to_string(),
    };

    match handle_file_delete(ctx.workspace_root, ctx.managed_doc_id_allowlist, request).await {
        Ok(ok) => {
            let body = serde_json::json!({
                "type": "file.delete.ok",
                "request_id": ok.request_id,
                "doc_id": ok.doc_id,
            });
            if let Err(e) = publish(hub, ctx.session_id, "file.delete.ok", Some(&ok.request_id), &body).await {
                report_publish_failure(error_sink, "file.delete.ok", e);
            }
        }
        Err((request_id, error)) => {
            let body = serde_json::json!({
                "type": "file.delete.error",
                "request_id": request_id,
                "code": error.code(),
            });
            if let Err(e) = publish(hub, ctx.session_id, "file.delete.error", Some(&request_id), &body).await {
                report_publish_failure(error_sink, "file.delete.error", e);
            }
        }
    }
}

/// Self-heal check, run on every tick and before each poll (spec §4.3.9).
/// Optionally asks the Hub to close the session as `failed` for the
/// connection-stale case, matching the source's documented best-effort
/// close call.
pub async fn run_self_heal_check(
    hub: &dyn HubApi,
    session_id: SessionId,
    thresholds: &SelfHealThresholds,
    now_ms: u64,
    session_created_at_ms: u64,
    in_fallback_state: bool,
    fallback_state_name: &str,
    last_connection_state_change_ms: u64,
    last_health_activity_ms: u64,
    error_sink: &dyn ErrorSink,
) -> Option<SelfHealReason> {
    let reason = self_heal::evaluate(
        thresholds,
        now_ms,
        session_created_at_ms,
        in_fallback_state,
        last_connection_state_change_ms,
        last_health_activity_ms,
    )?;

    if reason == SelfHealReason::FallbackStale {
        if let Err(e) = hub.close_session(session_id, "failed").await {
            error_sink.report(RuntimeError::new(
                RuntimeErrorKind::TransientNetwork,
                "session_worker",
                format!("self-heal close_session failed: {e}"),
            ));
        }
    }

    Some(reason)
}

/// Runtime knobs a running worker needs, bundled so `run` doesn't take a
/// dozen positional arguments.
pub struct WorkerTuning {
    pub catch_up_poll_interval: Duration,
    pub fallback_poll_interval: Duration,
    pub signal_poll_backoff: Duration,
    pub self_heal: SelfHealThresholds,
    pub list_limit: u32,
}

/// Connects the session's signed private channel, retrying a few times
/// before giving up — mirrors the teacher's `connect_ws` (spec §4.3.12):
/// startup failure never panics, it just means the caller falls back to
/// HTTP-only polling.
async fn connect_ws(
    url: &str,
) -> Option<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>> {
    for attempt in 0..5 {
        if attempt > 0 {
            tokio::time::sleep(agentmc_adapters::transport::reconnect_backoff(attempt)).await;
        }
        if let Ok((stream, _response)) = tokio_tungstenite::connect_async(url).await {
            return Some(stream);
        }
    }
    None
}

/// Drives one session end to end: best-effort websocket connect (falling
/// back to HTTP-only polling on failure), the dual-cadence HTTP fallback
/// poller, inbound processing, and the self-heal tick — until the socket
/// closes, self-heal fires, or `shutdown` resolves (spec §4.3).
///
/// Like the teacher's `event_bridge`, the connect/read loop itself is
/// exercised only by the pure helpers above (`classify_inbound`,
/// `poll_interval`, `WorkerCursors::accept`) — a live socket is not
/// something a unit test can stand up.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    hub: &dyn HubApi,
    runner: &dyn ChatRunFn,
    ctx: WorkerContext<'_>,
    websocket_url: &str,
    tuning: &WorkerTuning,
    notifications_enabled: bool,
    session_created_at_ms: u64,
    now_ms_fn: impl Fn() -> u64,
    error_sink: &dyn ErrorSink,
    mut shutdown: tokio::sync::oneshot::Receiver<()>,
) {
    use futures_util::StreamExt;
    use tokio_tungstenite::tungstenite::Message;

    let mut cursors = WorkerCursors::default();
    let mut dedupe = ProcessedKeyCache::new(agentmc_core::SystemClock, 45_000);
    let mut observer = ConnectionObserver::default();
    let mut in_fallback = false;
    let mut last_connection_state_change_ms = now_ms_fn();
    let mut last_health_activity_ms = last_connection_state_change_ms;

    let ws_stream = connect_ws(websocket_url).await;
    let mut read_half = match ws_stream {
        Some(stream) => {
            in_fallback = false;
            last_connection_state_change_ms = now_ms_fn();
            let reason = observer.on_connected();
            let snapshot = build_snapshot_payload(ctx.workspace_root, ctx.managed_doc_id_allowlist, None, reason).await;
            if let Err(e) = publish(hub, ctx.session_id, "snapshot.response", None, &snapshot.to_json()).await {
                report_publish_failure(error_sink, "snapshot.response", e);
            }
            Some(stream.split().1)
        }
        None => {
            in_fallback = true;
            last_connection_state_change_ms = now_ms_fn();
            error_sink.report(RuntimeError::new(
                RuntimeErrorKind::TransientNetwork,
                "session_worker",
                "websocket connect failed, falling back to HTTP polling",
            ));
            None
        }
    };

    let mut poll_tick = tokio::time::interval(poll_interval(
        in_fallback,
        tuning.catch_up_poll_interval,
        tuning.fallback_poll_interval,
    ));
    let mut self_heal_tick = tokio::time::interval(Duration::from_secs(5));
    let mut next_poll_delay = tuning.catch_up_poll_interval;

    loop {
        tokio::select! {
            _ = &mut shutdown => return,
            _ = self_heal_tick.tick() => {
                let now_ms = now_ms_fn();
                let fallback_name = if in_fallback { "unavailable" } else { "connected" };
                if run_self_heal_check(
                    hub, ctx.session_id, &tuning.self_heal, now_ms, session_created_at_ms,
                    in_fallback, fallback_name, last_connection_state_change_ms, last_health_activity_ms,
                    error_sink,
                ).await.is_some() {
                    return;
                }
            }
            _ = poll_tick.tick() => {
                match hub.list_signals(ctx.session_id, cursors.last_non_agent_signal_id, Some("agent"), tuning.list_limit).await {
                    Ok(response) => {
                        next_poll_delay = poll_interval(in_fallback, tuning.catch_up_poll_interval, tuning.fallback_poll_interval);
                        for signal in &response.signals {
                            if !cursors.accept(signal.id, signal.sender) {
                                continue;
                            }
                            last_health_activity_ms = now_ms_fn();
                            let outcome = process_signal(hub, runner, &mut dedupe, &ctx, signal, notifications_enabled, error_sink).await;
                            if outcome == ProcessOutcome::Closed {
                                return;
                            }
                        }
                    }
                    Err(e) if e.is_session_gone() => {
                        error_sink.report(RuntimeError::new(RuntimeErrorKind::SessionGone, "session_worker", e.to_string()));
                        return;
                    }
                    Err(e) if e.is_rate_limited() => {
                        next_poll_delay = tuning.signal_poll_backoff;
                    }
                    Err(e) => {
                        error_sink.report(RuntimeError::new(RuntimeErrorKind::TransientNetwork, "session_worker", e.to_string()));
                    }
                }
                poll_tick = tokio::time::interval(next_poll_delay);
                poll_tick.reset();
            }
            msg = async { match &mut read_half { Some(r) => r.next().await, None => std::future::pending().await } } => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(signal) = serde_json::from_str::<SignalMessage>(&text) {
                            if cursors.accept(signal.id, signal.sender) {
                                last_health_activity_ms = now_ms_fn();
                                let outcome = process_signal(hub, runner, &mut dedupe, &ctx, &signal, notifications_enabled, error_sink).await;
                                if outcome == ProcessOutcome::Closed {
                                    return;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        in_fallback = true;
                        last_connection_state_change_ms = now_ms_fn();
                        read_half = None;
                        poll_tick = tokio::time::interval(tuning.fallback_poll_interval);
                        poll_tick.reset();
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "session_worker_tests.rs"]
mod tests;
