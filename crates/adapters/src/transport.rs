// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Realtime Transport (spec §4.3.2, §4.3.10, §4.3.11, §4.3.12): the
//! websocket primitives a Session Worker drives — connect/subscribe,
//! the ready barrier, reconnect backoff, and outbound chunking.

use crate::error::TransportError;
use agentmc_core::SocketAuth;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

pub const MAX_PAYLOAD_BYTES: usize = 9000;
pub const MAX_ENVELOPE_BYTES: usize = 10000;
const READY_TIMEOUT: Duration = Duration::from_secs(45);
const BACKOFF_CAP: Duration = Duration::from_secs(12);
const MAX_CHUNK_ITERATIONS: usize = 6;

/// An inbound frame observed on the websocket, loosely typed — callers
/// narrow `payload` per request-router rules (spec §4.3.4).
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Frame { signal_id: u64, raw: serde_json::Value },
    SubscriptionAcked,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    Acked,
    Rejected { status: u16, message: String },
}

/// Resolves once, at most once, when the channel acknowledges subscription.
/// Never resolving within 45s is surfaced as a timeout by the caller via
/// `tokio::time::timeout`; startup failure never panics the worker — it
/// is reported so the worker can fall back to HTTP polling (spec §4.3.12).
pub struct ReadyBarrier {
    receiver: Option<oneshot::Receiver<SubscriptionOutcome>>,
}

pub struct ReadyBarrierHandle {
    sender: oneshot::Sender<SubscriptionOutcome>,
}

impl ReadyBarrier {
    pub fn new() -> (Self, ReadyBarrierHandle) {
        let (tx, rx) = oneshot::channel();
        (Self { receiver: Some(rx) }, ReadyBarrierHandle { sender: tx })
    }

    /// Waits for the fulfillment, bounded by the 45s hard cap.
    pub async fn wait(&mut self) -> Result<SubscriptionOutcome, TransportError> {
        let receiver = self.receiver.take().ok_or(TransportError::ReadyTimeout)?;
        match tokio::time::timeout(READY_TIMEOUT, receiver).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::ReadyTimeout),
        }
    }
}

impl ReadyBarrierHandle {
    /// Fulfills the barrier. A second call is a silent no-op ("at most once").
    pub fn fulfill(self, outcome: SubscriptionOutcome) {
        let _ = self.sender.send(outcome);
    }
}

/// Reconnect backoff: `min(1s * 2^attempt, 12s)` (spec §4.3.11).
pub fn reconnect_backoff(attempt: u32) -> Duration {
    let millis = 1000u64.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(millis).min(BACKOFF_CAP)
}

/// Classifies a subscription failure into retryable vs non-retryable.
pub fn classify_subscription_failure(status: Option<u16>, message: &str) -> TransportError {
    match status {
        Some(status) => TransportError::SubscriptionRejected { status, message: message.to_string() },
        None => TransportError::Connect(message.to_string()),
    }
}

/// Builds the websocket URL to dial from a session's signed socket auth.
pub fn websocket_url(auth: &SocketAuth) -> String {
    auth.websocket_url()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEnvelope {
    pub chunk_id: String,
    pub chunk_index: u32,
    pub chunk_total: u32,
    pub chunk_encoding: String,
    pub chunk_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Estimates the on-wire size of an envelope: the JSON-encoded
/// `{type, payload, sender, id, timestamp}` frame the transport actually
/// sends, approximated by serializing a representative skeleton.
pub fn estimate_envelope_bytes(channel_type: &str, payload: &serde_json::Value) -> usize {
    let skeleton = serde_json::json!({
        "type": channel_type,
        "payload": payload,
        "sender": "agent",
        "id": 0,
        "timestamp": "0000-00-00T00:00:00Z",
    });
    serde_json::to_vec(&skeleton).map(|v| v.len()).unwrap_or(usize::MAX)
}

/// Splits an oversized payload into a sequence of chunk envelopes, or
/// returns a single-element vec containing the whole envelope when it
/// already fits both budgets (spec §4.3.10).
pub fn chunk_payload(
    channel_type: &str,
    request_id: Option<&str>,
    payload: &serde_json::Value,
) -> Result<Vec<serde_json::Value>, TransportError> {
    let fits = estimate_envelope_bytes(channel_type, payload) <= MAX_ENVELOPE_BYTES
        && serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(usize::MAX) <= MAX_PAYLOAD_BYTES;
    if fits {
        return Ok(vec![serde_json::json!({ "type": channel_type, "payload": payload })]);
    }

    let serialized = serde_json::to_vec(payload).map_err(|_| TransportError::ChunkOverflow)?;
    let encoded = base64_encode(&serialized);
    let chunk_id = agentmc_core::new_chunk_id();

    let mut chunk_count = 2u32;
    for _ in 0..MAX_CHUNK_ITERATIONS {
        let skeleton_bytes = estimate_chunk_skeleton_bytes(&chunk_id, chunk_count, request_id);
        let budget = MAX_ENVELOPE_BYTES.saturating_sub(skeleton_bytes);
        if budget == 0 {
            return Err(TransportError::ChunkOverflow);
        }
        let needed = encoded.len().div_ceil(budget).max(1) as u32;
        if needed == chunk_count {
            break;
        }
        chunk_count = needed;
    }

    let skeleton_bytes = estimate_chunk_skeleton_bytes(&chunk_id, chunk_count, request_id);
    let budget = MAX_ENVELOPE_BYTES.saturating_sub(skeleton_bytes);
    if budget == 0 {
        return Err(TransportError::ChunkOverflow);
    }

    let mut frames = Vec::new();
    for (index, slice) in encoded.as_bytes().chunks(budget).enumerate() {
        let envelope = ChunkEnvelope {
            chunk_id: chunk_id.clone(),
            chunk_index: index as u32 + 1,
            chunk_total: chunk_count,
            chunk_encoding: "base64json".into(),
            chunk_data: String::from_utf8_lossy(slice).into_owned(),
            request_id: request_id.map(str::to_owned),
        };
        frames.push(serde_json::json!({ "type": channel_type, "payload": envelope }));
    }
    Ok(frames)
}

fn estimate_chunk_skeleton_bytes(chunk_id: &str, chunk_total: u32, request_id: Option<&str>) -> usize {
    let skeleton = ChunkEnvelope {
        chunk_id: chunk_id.to_string(),
        chunk_index: chunk_total,
        chunk_total,
        chunk_encoding: "base64json".into(),
        chunk_data: String::new(),
        request_id: request_id.map(str::to_owned),
    };
    serde_json::to_vec(&skeleton).map(|v| v.len()).unwrap_or(usize::MAX)
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn base64_decode(s: &str) -> Result<Vec<u8>, TransportError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| TransportError::SubscriptionRejected { status: 0, message: e.to_string() })
}

/// Reassembles chunk envelopes (ordered by `chunk_index`) back into the
/// original JSON payload.
pub fn reassemble_chunks(chunks: &mut [ChunkEnvelope]) -> Result<serde_json::Value, TransportError> {
    chunks.sort_by_key(|c| c.chunk_index);
    let mut bytes = Vec::new();
    for chunk in chunks.iter() {
        bytes.extend_from_slice(chunk.chunk_data.as_bytes());
    }
    let decoded = base64_decode(&String::from_utf8_lossy(&bytes))?;
    serde_json::from_slice(&decoded)
        .map_err(|e| TransportError::SubscriptionRejected { status: 0, message: e.to_string() })
}

/// Placeholder for the live websocket connection — constructed by the
/// runtime crate with a concrete `tokio_tungstenite` stream. Kept minimal
/// here since connection lifecycle (reconnect loop, frame dispatch) is
/// the Session Worker's responsibility (spec §4.3).
pub struct WebSocketTransport {
    pub url: String,
}

impl WebSocketTransport {
    pub fn new(auth: &SocketAuth) -> Self {
        Self { url: websocket_url(auth) }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
