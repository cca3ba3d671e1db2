// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Signal envelope — the single ordered event type delivered over a
//! session's realtime channel (spec §3, §6).

use crate::value::TaggedValue;
use crate::SessionId;
use serde::{Deserialize, Serialize};

/// Who originated a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Agent,
    Browser,
    System,
}

impl Sender {
    pub fn is_agent(self) -> bool {
        matches!(self, Sender::Agent)
    }
}

/// One signal on a session. Ordering is monotonic on `id` within a sender
/// (spec §8 property 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalMessage {
    pub id: u64,
    pub session_id: SessionId,
    pub sender: Sender,
    #[serde(rename = "type")]
    pub signal_type: String,
    pub payload: TaggedValue,
    pub created_at: String,
}

impl SignalMessage {
    pub fn payload_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(|v| v.as_str())
    }
}
