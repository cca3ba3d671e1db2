// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! In-memory `HubApi` fake for runtime tests, mirroring the teacher's
//! `FakeAdapter` pattern (`crates/adapters` `test-support` feature).

use crate::client::HubApi;
use crate::error::HubError;
use crate::types::*;
use agentmc_core::SessionId;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Default)]
pub struct FakeHubClient {
    pub requested_sessions: Mutex<VecDeque<RequestedSessionsResponse>>,
    pub signals: Mutex<VecDeque<Result<ListSignalsResponse, HubError>>>,
    pub instructions: Mutex<VecDeque<Result<GetInstructionsResponse, HubError>>>,
    pub due_runs: Mutex<VecDeque<Result<ListDueRecurringTaskRunsResponse, HubError>>>,
    pub heartbeats_sent: Mutex<Vec<HeartbeatRequest>>,
    pub completed_runs: Mutex<Vec<(i64, CompleteRecurringTaskRunRequest)>>,
    pub created_signals: Mutex<Vec<(SessionId, CreateSignalRequest)>>,
    pub create_signal_results: Mutex<VecDeque<Result<(), HubError>>>,
    pub read_notifications: Mutex<Vec<i64>>,
    pub closed_sessions: Mutex<Vec<(SessionId, String)>>,
    pub auth_response: Mutex<Option<Result<AuthenticateSocketResponse, HubError>>>,
}

impl FakeHubClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HubApi for FakeHubClient {
    async fn list_requested_sessions(&self, _limit: u32) -> Result<RequestedSessionsResponse, HubError> {
        Ok(self
            .requested_sessions
            .lock()
            .pop_front()
            .unwrap_or(RequestedSessionsResponse { sessions: vec![] }))
    }

    async fn claim_session(&self, _session_id: SessionId) -> Result<(), HubError> {
        Ok(())
    }

    async fn authenticate_socket(
        &self,
        _req: AuthenticateSocketRequest,
    ) -> Result<AuthenticateSocketResponse, HubError> {
        self.auth_response.lock().take().unwrap_or_else(|| {
            Err(HubError::Status { status: 500, body: "no fake auth response queued".into() })
        })
    }

    async fn create_signal(
        &self,
        session_id: SessionId,
        req: CreateSignalRequest,
    ) -> Result<(), HubError> {
        let result = self.create_signal_results.lock().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.created_signals.lock().push((session_id, req));
        }
        result
    }

    async fn list_signals(
        &self,
        _session_id: SessionId,
        _after_id: u64,
        _exclude_sender: Option<&str>,
        _limit: u32,
    ) -> Result<ListSignalsResponse, HubError> {
        self.signals.lock().pop_front().unwrap_or(Ok(ListSignalsResponse { signals: vec![] }))
    }

    async fn close_session(&self, session_id: SessionId, status: &str) -> Result<(), HubError> {
        self.closed_sessions.lock().push((session_id, status.to_string()));
        Ok(())
    }

    async fn get_instructions(
        &self,
        _current_bundle_version: Option<&str>,
    ) -> Result<GetInstructionsResponse, HubError> {
        self.instructions.lock().pop_front().unwrap_or(Ok(GetInstructionsResponse {
            changed: false,
            bundle_version: "bundle-0".to_string(),
            files: vec![],
            defaults: InstructionDefaults { heartbeat_interval_seconds: Some(60) },
            agent_id: 1,
        }))
    }

    async fn heartbeat(&self, req: HeartbeatRequest) -> Result<(), HubError> {
        self.heartbeats_sent.lock().push(req);
        Ok(())
    }

    async fn list_agents(&self) -> Result<ListAgentsResponse, HubError> {
        Ok(ListAgentsResponse { agents: vec![] })
    }

    async fn list_due_recurring_task_runs(
        &self,
        _limit: u32,
    ) -> Result<ListDueRecurringTaskRunsResponse, HubError> {
        self.due_runs.lock().pop_front().unwrap_or(Ok(ListDueRecurringTaskRunsResponse { runs: vec![] }))
    }

    async fn complete_recurring_task_run(
        &self,
        run_id: i64,
        req: CompleteRecurringTaskRunRequest,
    ) -> Result<(), HubError> {
        self.completed_runs.lock().push((run_id, req));
        Ok(())
    }

    async fn mark_notification_read(&self, notification_id: i64) -> Result<(), HubError> {
        self.read_notifications.lock().push(notification_id);
        Ok(())
    }
}
