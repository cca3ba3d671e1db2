// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Supervisor Loop: the per-agent top-level orchestrator. Bootstraps one
//! instruction sync, starts the Session Poller, claims and spawns a Session
//! Worker for each discovered session, and drives the heartbeat/recurring
//! schedule until asked to stop (spec §4.1).

use crate::chat::{run_chat_embedded, ChatOutcome, ChatRunFn, ChatRunInput};
use crate::config::RuntimeConfig;
use crate::context_block::ChatContext;
use crate::heartbeat::{send_heartbeat, HeartbeatInputs, ToolAvailability};
use crate::instruction_sync::sync_instructions;
use crate::notification::NotificationConfig;
use crate::recurring::poll_and_run;
use crate::self_heal::SelfHealThresholds;
use crate::session_poller;
use crate::session_worker::{self, WorkerContext, WorkerTuning};
use agentmc_adapters::gateway::EngineGateway;
use agentmc_core::{AgentProfile, Clock, EngineProvider, ErrorSink, RuntimeError, RuntimeErrorKind, Session};
use agentmc_hub::types::AuthenticateSocketRequest;
use agentmc_hub::HubApi;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const MIN_TICK: Duration = Duration::from_millis(250);

/// Everything the Supervisor Loop needs that isn't a tunable: one Hub
/// client, one Engine gateway, and the Engine/profile identity already
/// resolved by the caller (spec §4.6, §4.7 — discovery happens once at
/// daemon bootstrap, not on every loop tick).
pub struct SupervisorDeps {
    pub hub: Arc<dyn HubApi>,
    pub gateway: Arc<dyn EngineGateway>,
    pub engine_agent_token: String,
    pub engine_binary: Option<PathBuf>,
    pub session_history_path: Option<PathBuf>,
    pub provider: EngineProvider,
    pub profile: AgentProfile,
    pub error_sink: Arc<dyn ErrorSink>,
}

/// Converts a resolved `EngineGateway` into the `ChatRunFn` the Session
/// Worker drives — the same submit/wait/error shape `chat.rs` already
/// implements, just wired to the deps the Supervisor Loop owns.
struct EmbeddedChatRunner {
    gateway: Arc<dyn EngineGateway>,
    engine_agent_token: String,
    session_history_path: Option<PathBuf>,
    wait_timeout: Duration,
}

#[async_trait]
impl ChatRunFn for EmbeddedChatRunner {
    async fn run(&self, input: ChatRunInput) -> ChatOutcome {
        let exec_timeout = RuntimeConfig::gateway_exec_timeout(self.wait_timeout);
        run_chat_embedded(
            self.gateway.as_ref(),
            &self.engine_agent_token,
            self.session_history_path.as_deref(),
            input,
            self.wait_timeout,
            exec_timeout,
        )
        .await
    }
}

/// Whichever of the heartbeat/recurring deadlines is next due (spec §4.1
/// step 5): the loop sleeps until the sooner of the two, never less than
/// `MIN_TICK` so a clock that's already past both deadlines can't spin.
pub fn sleep_duration(now_ms: u64, next_heartbeat_at: u64, next_recurring_at: u64) -> Duration {
    let until_heartbeat = next_heartbeat_at.saturating_sub(now_ms);
    let until_recurring = next_recurring_at.saturating_sub(now_ms);
    Duration::from_millis(until_heartbeat.min(until_recurring)).max(MIN_TICK)
}

pub fn is_heartbeat_due(now_ms: u64, next_heartbeat_at: u64) -> bool {
    now_ms >= next_heartbeat_at
}

pub fn is_recurring_due(now_ms: u64, next_recurring_at: u64) -> bool {
    now_ms >= next_recurring_at
}

/// Derives `ToolAvailability` from the runtime config: chat is always live
/// (the Session Worker always routes `message` signals), files/notifications
/// track whether the runtime was configured to handle them at all.
pub fn tool_availability(config: &RuntimeConfig) -> ToolAvailability {
    ToolAvailability {
        chat_realtime: true,
        files_realtime: !config.managed_doc_id_allowlist.is_empty(),
        notifications_realtime: config.notifications_enabled,
    }
}

struct RunningWorker {
    session_id: agentmc_core::SessionId,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct SupervisorLoop<C: Clock> {
    deps: SupervisorDeps,
    config: RuntimeConfig,
    clock: C,
    agent_id: i64,
    heartbeat_interval_ms: u64,
    workers: Vec<RunningWorker>,
}

impl<C: Clock> SupervisorLoop<C> {
    /// Bootstraps the loop: one instruction sync, fail-stop if the Hub
    /// never hands back a heartbeat interval (spec §4.1 step 2 — this is
    /// the one fatal condition in the whole protocol).
    pub async fn bootstrap(deps: SupervisorDeps, config: RuntimeConfig, clock: C) -> Result<Self, RuntimeError> {
        let now_iso = chrono::Utc::now().to_rfc3339();
        let outcome = sync_instructions(deps.hub.as_ref(), &config.workspace_dir, &config.state_file, &now_iso)
            .await
            .map_err(|e| RuntimeError::new(RuntimeErrorKind::Configuration, "supervisor", e.to_string()))?;

        let Some(heartbeat_interval_s) = outcome.heartbeat_interval_seconds else {
            return Err(RuntimeError::new(
                RuntimeErrorKind::Configuration,
                "supervisor",
                "Hub returned no heartbeat interval at bootstrap".to_string(),
            ));
        };

        Ok(Self {
            deps,
            config,
            clock,
            agent_id: outcome.agent_id,
            heartbeat_interval_ms: heartbeat_interval_s * 1000,
            workers: Vec::new(),
        })
    }

    fn chat_context(&self) -> ChatContext {
        ChatContext {
            app: self.config.bridge_app.clone(),
            source: self.config.bridge_source.clone(),
            intent_scope: self.config.bridge_intent_scope.clone(),
            timezone: self.config.timezone.clone(),
            actor_user_id: None,
            default_assignee_user_id: self.config.default_assignee_user_id,
        }
    }

    fn notification_config(&self) -> NotificationConfig {
        NotificationConfig {
            forward_read_notifications: self.config.forward_read_notifications,
            type_allowlist: self.config.notification_type_allowlist.clone(),
        }
    }

    fn worker_tuning(&self) -> WorkerTuning {
        WorkerTuning {
            catch_up_poll_interval: self.config.catch_up_poll_interval,
            fallback_poll_interval: self.config.fallback_poll_interval,
            signal_poll_backoff: self.config.signal_poll_backoff(),
            self_heal: SelfHealThresholds {
                min_age: self.config.session_min_age,
                connection_stale: self.config.connection_stale_threshold,
                activity_stale: self.config.activity_stale_threshold,
            },
            list_limit: 50,
        }
    }

    /// Claims a newly-discovered session, mints a fresh signed channel auth,
    /// and spawns its Session Worker. Neither the Session Poller nor the
    /// Session Worker perform the claim/authenticate handshake themselves —
    /// it belongs here, where a session first becomes "ours" (spec §4.2,
    /// §4.3.1).
    async fn spawn_worker(&mut self, session: Session) {
        if let Err(e) = self.deps.hub.claim_session(session.id).await {
            self.deps.error_sink.report(RuntimeError::new(
                RuntimeErrorKind::TransientNetwork,
                "supervisor",
                format!("claim_session({}) failed: {e}", session.id.get()),
            ));
            return;
        }

        let socket_id = agentmc_core::new_request_id();
        let auth = match self
            .deps
            .hub
            .authenticate_socket(AuthenticateSocketRequest { socket_id, channel_name: session.socket.channel.clone() })
            .await
        {
            Ok(response) => response.auth,
            Err(e) => {
                self.deps.error_sink.report(RuntimeError::new(
                    RuntimeErrorKind::Auth,
                    "supervisor",
                    format!("authenticate_socket({}) failed: {e}", session.id.get()),
                ));
                return;
            }
        };
        let websocket_url = auth.websocket_url();

        let hub = self.deps.hub.clone();
        let runner: Arc<dyn ChatRunFn> = Arc::new(EmbeddedChatRunner {
            gateway: self.deps.gateway.clone(),
            engine_agent_token: self.deps.engine_agent_token.clone(),
            session_history_path: self.deps.session_history_path.clone(),
            wait_timeout: self.config.chat_wait_timeout,
        });
        let error_sink = self.deps.error_sink.clone();
        let clock = self.clock.clone();

        let workspace_root = self.config.workspace_dir.clone();
        let allowlist = self.config.managed_doc_id_allowlist.clone();
        let notification_config = self.notification_config();
        let mut chat_context = self.chat_context();
        chat_context.actor_user_id = session.requested_by_user_id;
        let thinking_placeholder = self.config.thinking_placeholder.clone();
        let tuning = self.worker_tuning();
        let notifications_enabled = self.config.notifications_enabled;
        let session_id = session.id;
        let session_created_at_ms = self.clock.epoch_ms();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let ctx = WorkerContext {
                session_id,
                workspace_root: &workspace_root,
                managed_doc_id_allowlist: &allowlist,
                notification_config: &notification_config,
                chat_context: &chat_context,
                thinking_placeholder: thinking_placeholder.as_deref(),
            };
            session_worker::run(
                hub.as_ref(),
                runner.as_ref(),
                ctx,
                &websocket_url,
                &tuning,
                notifications_enabled,
                session_created_at_ms,
                move || clock.epoch_ms(),
                error_sink.as_ref(),
                shutdown_rx,
            )
            .await;
        });

        self.workers.push(RunningWorker { session_id, shutdown: shutdown_tx, handle });
    }

    async fn run_recurring_tick(&self) {
        let now_iso = chrono::Utc::now().to_rfc3339();
        if let Err(e) = poll_and_run(
            self.deps.hub.as_ref(),
            self.deps.gateway.as_ref(),
            &self.deps.engine_agent_token,
            self.agent_id,
            &[],
            &self.deps.provider,
            20,
            self.config.recurring_wait_timeout,
            &now_iso,
            &now_iso,
        )
        .await
        {
            self.deps.error_sink.report(RuntimeError::new(RuntimeErrorKind::TransientNetwork, "supervisor", e.to_string()));
        }
    }

    /// Runs one instruction sync; returns whether the bundle changed (the
    /// caller restarts the Session Poller on `true`, spec §4.8).
    async fn run_heartbeat_tick(&mut self) -> bool {
        let now_iso = chrono::Utc::now().to_rfc3339();
        let changed = match sync_instructions(self.deps.hub.as_ref(), &self.config.workspace_dir, &self.config.state_file, &now_iso).await
        {
            Ok(outcome) => {
                self.agent_id = outcome.agent_id;
                if let Some(interval_s) = outcome.heartbeat_interval_seconds {
                    self.heartbeat_interval_ms = interval_s * 1000;
                }
                outcome.changed
            }
            Err(e) => {
                self.deps.error_sink.report(RuntimeError::new(RuntimeErrorKind::TransientNetwork, "supervisor", e.to_string()));
                false
            }
        };

        let inputs = HeartbeatInputs {
            provider: &self.deps.provider,
            profile: &self.deps.profile,
            tool_availability: tool_availability(&self.config),
            fingerprint_override: self.config.fingerprint_override.as_deref(),
            public_ip_override: None,
            ip_echo_endpoints: &self.config.public_ip_echo_endpoints,
            engine_binary: self.deps.engine_binary.as_deref(),
        };
        if let Err(e) = send_heartbeat(self.deps.hub.as_ref(), &self.config.state_file, &inputs, &now_iso).await {
            self.deps.error_sink.report(RuntimeError::new(RuntimeErrorKind::TransientNetwork, "supervisor", e.to_string()));
        }

        changed
    }

    /// Stops every running worker, optionally closing its session on the Hub
    /// first (spec §4.1 step 6, `close_session_on_stop`).
    async fn stop_workers(&mut self) {
        for worker in self.workers.drain(..) {
            if self.config.close_session_on_stop {
                if let Err(e) = self.deps.hub.close_session(worker.session_id, "closed").await {
                    self.deps.error_sink.report(RuntimeError::new(
                        RuntimeErrorKind::TransientNetwork,
                        "supervisor",
                        format!("close_session({}) failed: {e}", worker.session_id.get()),
                    ));
                }
            }
            let _ = worker.shutdown.send(());
            let _ = worker.handle.await;
        }
    }

    /// Drives the loop until `shutdown` fires: Session Poller spawned
    /// alongside, one heartbeat and one recurring-task deadline ticking
    /// independently (spec §4.1 step 5), Session Poller restarted whenever
    /// an instruction sync reports a changed bundle.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let recurring_interval_ms = self.config.recurring_poll_interval.as_millis() as u64;

        let (mut spawn_tx, mut spawn_rx, mut poller_shutdown, mut poller_handle) = self.start_poller();

        // Startup heartbeat (spec §4.1 step 4).
        self.run_heartbeat_tick().await;

        let mut now_ms = self.clock.epoch_ms();
        let mut next_heartbeat_at = now_ms + self.heartbeat_interval_ms;
        let mut next_recurring_at = now_ms + recurring_interval_ms;

        loop {
            let sleep_for = sleep_duration(now_ms, next_heartbeat_at, next_recurring_at);
            tokio::select! {
                _ = &mut shutdown => break,
                session = spawn_rx.recv() => {
                    if let Some(session) = session {
                        self.spawn_worker(session).await;
                    }
                }
                _ = tokio::time::sleep(sleep_for) => {
                    now_ms = self.clock.epoch_ms();

                    if is_recurring_due(now_ms, next_recurring_at) {
                        self.run_recurring_tick().await;
                        next_recurring_at = now_ms + recurring_interval_ms;
                    }

                    if is_heartbeat_due(now_ms, next_heartbeat_at) {
                        let changed = self.run_heartbeat_tick().await;
                        if changed {
                            let _ = poller_shutdown.send(());
                            let _ = poller_handle.await;
                            let restarted = self.start_poller();
                            spawn_tx = restarted.0;
                            spawn_rx = restarted.1;
                            poller_shutdown = restarted.2;
                            poller_handle = restarted.3;
                        }
                        next_heartbeat_at = now_ms + self.heartbeat_interval_ms;
                    }
                }
            }
            now_ms = self.clock.epoch_ms();
        }

        drop(spawn_tx);
        let _ = poller_shutdown.send(());
        let _ = poller_handle.await;
        self.stop_workers().await;
    }

    fn start_poller(
        &self,
    ) -> (mpsc::UnboundedSender<Session>, mpsc::UnboundedReceiver<Session>, oneshot::Sender<()>, JoinHandle<()>) {
        let (spawn_tx, spawn_rx) = mpsc::unbounded_channel();
        let (poller_shutdown_tx, poller_shutdown_rx) = oneshot::channel();
        let hub = self.deps.hub.clone();
        let error_sink = self.deps.error_sink.clone();
        let list_limit = 50;
        let poll_interval = self.config.session_poll_interval;
        let backoff = self.config.session_poller_backoff();
        let spawn_tx_for_task = spawn_tx.clone();
        let handle = tokio::spawn(async move {
            session_poller::run(
                hub.as_ref(),
                list_limit,
                poll_interval,
                backoff,
                spawn_tx_for_task,
                error_sink.as_ref(),
                poller_shutdown_rx,
            )
            .await;
        });
        (spawn_tx, spawn_rx, poller_shutdown_tx, handle)
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
