// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

use thiserror::Error;

/// Errors from the Engine Gateway (subprocess submit/wait).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("engine gateway command not available: {0}")]
    NotAvailable(String),
    #[error("engine gateway spawn failed: {0}")]
    SpawnFailed(String),
    #[error("engine gateway timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("engine gateway returned unparseable output: {0}")]
    Decode(String),
    #[error("engine gateway exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },
}

/// Errors from the realtime websocket transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("subscription rejected ({status}): {message}")]
    SubscriptionRejected { status: u16, message: String },
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("ready barrier timed out")]
    ReadyTimeout,
    #[error("payload does not fit even at minimum chunk size")]
    ChunkOverflow,
    #[error("socket closed")]
    Closed,
}

impl TransportError {
    /// HTTP-equivalent statuses that should never be retried (spec 4.3.11).
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::SubscriptionRejected { status, .. } => {
                !matches!(status, 401 | 403 | 404 | 422)
            }
            TransportError::Connect(_) => true,
            TransportError::ReadyTimeout => true,
            TransportError::ChunkOverflow | TransportError::Closed => false,
        }
    }
}
