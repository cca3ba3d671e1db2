// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Identifier types.
//!
//! The Hub assigns small positive integers to agents and sessions, so
//! `AgentId`/`SessionId` wrap `u64` directly rather than using string IDs.
//! Request-scoped identifiers (`request_id`, `run_id`, `chunk_id`,
//! `idempotency_key`) are opaque strings minted with `nanoid`, mirroring how
//! the teacher mints its `job-`/`agt-` prefixed IDs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    let end = s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len());
    &s[..end]
}

macro_rules! define_int_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                Self(v)
            }
        }
    };
}

define_int_id! {
    /// Identifies one agent credential / workspace binding.
    pub struct AgentId;
}

define_int_id! {
    /// Identifies one Hub-managed session.
    pub struct SessionId;
}

/// A request-scoped identifier minted locally (e.g. when the Hub payload
/// carries no `request_id`). Not a newtype over a fixed prefix since callers
/// also need to echo IDs that originated on the Hub side verbatim.
pub fn new_request_id() -> String {
    format!("req-{}", nanoid::nanoid!(16))
}

/// An idempotency key scoped to one chat exchange.
pub fn new_run_id() -> String {
    format!("run-{}", nanoid::nanoid!(16))
}

/// A stable chunk-group identifier for oversized outbound payloads.
pub fn new_chunk_id() -> String {
    format!("chunk-{}", nanoid::nanoid!(12))
}

/// Marker type kept for symmetry with [`AgentId`]/[`SessionId`] call sites
/// that want to talk about "some run" without committing to String.
pub type RunId = String;
pub type RequestId = String;

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
