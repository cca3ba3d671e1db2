// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! In-memory fakes for `EngineGateway`, used by runtime-crate tests so
//! the Session Worker's chat-exchange logic can be exercised without a
//! subprocess (spec §8 test strategy).

use crate::error::GatewayError;
use crate::gateway::{EngineGateway, SubmitRequest, WaitRequest, WaitResponse, WaitStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Default)]
pub struct FakeGateway {
    submit_results: Mutex<VecDeque<Result<String, GatewayError>>>,
    wait_results: Mutex<VecDeque<Result<WaitResponse, GatewayError>>>,
    submit_calls: Mutex<Vec<SubmitRequest>>,
    wait_calls: Mutex<Vec<WaitRequest>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_submit(&self, result: Result<String, GatewayError>) {
        self.submit_results.lock().push_back(result);
    }

    pub fn push_wait_ok(&self, body: serde_json::Value) {
        self.wait_results.lock().push_back(Ok(WaitResponse { status: WaitStatus::Ok, body, error: None }));
    }

    pub fn push_wait_timeout(&self) {
        self.wait_results.lock().push_back(Ok(WaitResponse {
            status: WaitStatus::Timeout,
            body: serde_json::Value::Null,
            error: None,
        }));
    }

    pub fn push_wait_error(&self, message: impl Into<String>) {
        self.wait_results.lock().push_back(Ok(WaitResponse {
            status: WaitStatus::Error,
            body: serde_json::Value::Null,
            error: Some(message.into()),
        }));
    }

    pub fn submit_calls(&self) -> Vec<SubmitRequest> {
        self.submit_calls.lock().clone()
    }

    pub fn wait_calls(&self) -> Vec<WaitRequest> {
        self.wait_calls.lock().clone()
    }
}

#[async_trait]
impl EngineGateway for FakeGateway {
    async fn submit(&self, request: SubmitRequest) -> Result<String, GatewayError> {
        self.submit_calls.lock().push(request.clone());
        self.submit_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("run-{}", request.idempotency_key)))
    }

    async fn wait(
        &self,
        request: WaitRequest,
        _exec_timeout: std::time::Duration,
    ) -> Result<WaitResponse, GatewayError> {
        self.wait_calls.lock().push(request);
        self.wait_results.lock().pop_front().unwrap_or(Ok(WaitResponse {
            status: WaitStatus::Ok,
            body: serde_json::json!({}),
            error: None,
        }))
    }
}
