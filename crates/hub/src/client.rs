// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Typed Hub REST client (spec §4.1's "Hub Client" leaf component).
//!
//! No retry logic lives here — every method returns `Result<T, HubError>`
//! and callers decide whether/when to retry based on [`HubError`]'s
//! classification helpers. This mirrors the teacher's `AgentAdapter` trait
//! shape (`crates/adapters/src/agent/mod.rs`): a small async trait with a
//! single concrete HTTP-backed implementation, so runtime tests can swap in
//! a fake.

use crate::error::HubError;
use crate::types::*;
use agentmc_core::SessionId;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait HubApi: Send + Sync {
    async fn list_requested_sessions(&self, limit: u32) -> Result<RequestedSessionsResponse, HubError>;
    async fn claim_session(&self, session_id: SessionId) -> Result<(), HubError>;
    async fn authenticate_socket(
        &self,
        req: AuthenticateSocketRequest,
    ) -> Result<AuthenticateSocketResponse, HubError>;
    async fn create_signal(
        &self,
        session_id: SessionId,
        req: CreateSignalRequest,
    ) -> Result<(), HubError>;
    async fn list_signals(
        &self,
        session_id: SessionId,
        after_id: u64,
        exclude_sender: Option<&str>,
        limit: u32,
    ) -> Result<ListSignalsResponse, HubError>;
    async fn close_session(&self, session_id: SessionId, status: &str) -> Result<(), HubError>;
    async fn get_instructions(
        &self,
        current_bundle_version: Option<&str>,
    ) -> Result<GetInstructionsResponse, HubError>;
    async fn heartbeat(&self, req: HeartbeatRequest) -> Result<(), HubError>;
    async fn list_agents(&self) -> Result<ListAgentsResponse, HubError>;
    async fn list_due_recurring_task_runs(
        &self,
        limit: u32,
    ) -> Result<ListDueRecurringTaskRunsResponse, HubError>;
    async fn complete_recurring_task_run(
        &self,
        run_id: i64,
        req: CompleteRecurringTaskRunRequest,
    ) -> Result<(), HubError>;
    async fn mark_notification_read(&self, notification_id: i64) -> Result<(), HubError>;
}

/// HTTPS-backed implementation. Injects the agent's bearer credential on
/// every request; never retries internally.
pub struct HttpHubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpHubClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url: base_url.into(), api_key: api_key.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, HubError> {
        let response = builder
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::Status { status, body });
        }
        response.json::<T>().await.map_err(|e| HubError::Decode(e.to_string()))
    }

    async fn send_no_content(&self, builder: reqwest::RequestBuilder) -> Result<(), HubError> {
        let response = builder
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::Status { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl HubApi for HttpHubClient {
    async fn list_requested_sessions(&self, limit: u32) -> Result<RequestedSessionsResponse, HubError> {
        let builder = self
            .http
            .get(self.url("/api/sessions/requested"))
            .query(&[("limit", limit.to_string())]);
        self.send(builder).await
    }

    async fn claim_session(&self, session_id: SessionId) -> Result<(), HubError> {
        let builder = self.http.post(self.url(&format!("/api/sessions/{session_id}/claim")));
        self.send_no_content(builder).await
    }

    async fn authenticate_socket(
        &self,
        req: AuthenticateSocketRequest,
    ) -> Result<AuthenticateSocketResponse, HubError> {
        let builder = self.http.post(self.url("/api/realtime/auth")).json(&req);
        self.send(builder).await
    }

    async fn create_signal(
        &self,
        session_id: SessionId,
        req: CreateSignalRequest,
    ) -> Result<(), HubError> {
        let builder =
            self.http.post(self.url(&format!("/api/sessions/{session_id}/signals"))).json(&req);
        self.send_no_content(builder).await
    }

    async fn list_signals(
        &self,
        session_id: SessionId,
        after_id: u64,
        exclude_sender: Option<&str>,
        limit: u32,
    ) -> Result<ListSignalsResponse, HubError> {
        let mut query = vec![("after_id", after_id.to_string()), ("limit", limit.to_string())];
        if let Some(sender) = exclude_sender {
            query.push(("exclude_sender", sender.to_string()));
        }
        let builder = self
            .http
            .get(self.url(&format!("/api/sessions/{session_id}/signals")))
            .query(&query);
        self.send(builder).await
    }

    async fn close_session(&self, session_id: SessionId, status: &str) -> Result<(), HubError> {
        let builder = self
            .http
            .post(self.url(&format!("/api/sessions/{session_id}/close")))
            .json(&serde_json::json!({ "status": status }));
        self.send_no_content(builder).await
    }

    async fn get_instructions(
        &self,
        current_bundle_version: Option<&str>,
    ) -> Result<GetInstructionsResponse, HubError> {
        let mut builder = self.http.get(self.url("/api/instructions"));
        if let Some(version) = current_bundle_version {
            builder = builder.query(&[("bundle_version", version)]);
        }
        self.send(builder).await
    }

    async fn heartbeat(&self, req: HeartbeatRequest) -> Result<(), HubError> {
        let builder = self.http.post(self.url("/api/heartbeat")).json(&req);
        self.send_no_content(builder).await
    }

    async fn list_agents(&self) -> Result<ListAgentsResponse, HubError> {
        let builder = self.http.get(self.url("/api/agents"));
        self.send(builder).await
    }

    async fn list_due_recurring_task_runs(
        &self,
        limit: u32,
    ) -> Result<ListDueRecurringTaskRunsResponse, HubError> {
        let builder = self
            .http
            .get(self.url("/api/recurring-task-runs/due"))
            .query(&[("limit", limit.to_string())]);
        self.send(builder).await
    }

    async fn complete_recurring_task_run(
        &self,
        run_id: i64,
        req: CompleteRecurringTaskRunRequest,
    ) -> Result<(), HubError> {
        let builder = self
            .http
            .post(self.url(&format!("/api/recurring-task-runs/{run_id}/complete")))
            .json(&req);
        self.send_no_content(builder).await
    }

    async fn mark_notification_read(&self, notification_id: i64) -> Result<(), HubError> {
        let builder = self
            .http
            .post(self.url(&format!("/api/notifications/{notification_id}/read")));
        self.send_no_content(builder).await
    }
}
