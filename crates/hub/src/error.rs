// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Hub error shape — `(status, body)` pairs (spec §6), with the
//! status-driven classification helpers the Session Worker and Session
//! Poller branch on (spec §4.2, §4.3.2, §7).

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum HubError {
    #[error("hub returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request to hub failed: {0}")]
    Transport(String),
    #[error("hub response could not be decoded: {0}")]
    Decode(String),
}

impl HubError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HubError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            HubError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// 429 — caller should back off (spec §4.2, §4.3.2).
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// 404/409/422 on a session operation — the Hub considers the session
    /// gone; close the worker locally and don't retry (spec §4.3.2, §7).
    pub fn is_session_gone(&self) -> bool {
        matches!(self.status(), Some(404) | Some(409) | Some(422))
    }

    /// 401/403 — surfaced, worker closes `failed`, not retried locally.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// 5xx/408/transport-level — retried only on the next scheduled tick.
    pub fn is_transient(&self) -> bool {
        match self {
            HubError::Transport(_) => true,
            HubError::Status { status, .. } => *status >= 500 || *status == 408,
            HubError::Decode(_) => false,
        }
    }
}
