// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Self-heal: stale-session detection thresholds, checked on every tick
//! and before each poll (spec §4.3.9).

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfHealReason {
    FallbackStale,
    ActivityStale,
}

impl SelfHealReason {
    /// `session_self_heal_<state>_stale` / `session_self_heal_activity_stale`.
    pub fn close_reason(self, fallback_state_name: &str) -> String {
        match self {
            SelfHealReason::FallbackStale => format!("session_self_heal_{fallback_state_name}_stale"),
            SelfHealReason::ActivityStale => "session_self_heal_activity_stale".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SelfHealThresholds {
    pub min_age: Duration,
    pub connection_stale: Duration,
    pub activity_stale: Duration,
}

/// Evaluates the self-heal rules for one session (spec §4.3.9):
/// sessions younger than `min_age` are always skipped; a session stuck in
/// a fallback state beyond `connection_stale` *and* quiet beyond the same
/// threshold is closed for connection staleness; otherwise a session quiet
/// beyond `activity_stale` is closed for activity staleness.
pub fn evaluate(
    thresholds: &SelfHealThresholds,
    now_ms: u64,
    session_created_at_ms: u64,
    in_fallback_state: bool,
    last_connection_state_change_ms: u64,
    last_health_activity_ms: u64,
) -> Option<SelfHealReason> {
    if now_ms.saturating_sub(session_created_at_ms) < thresholds.min_age.as_millis() as u64 {
        return None;
    }

    let connection_stale_ms = thresholds.connection_stale.as_millis() as u64;
    if in_fallback_state
        && now_ms.saturating_sub(last_connection_state_change_ms) >= connection_stale_ms
        && now_ms.saturating_sub(last_health_activity_ms) >= connection_stale_ms
    {
        return Some(SelfHealReason::FallbackStale);
    }

    let activity_stale_ms = thresholds.activity_stale.as_millis() as u64;
    if now_ms.saturating_sub(last_health_activity_ms) >= activity_stale_ms {
        return Some(SelfHealReason::ActivityStale);
    }

    None
}

#[cfg(test)]
#[path = "self_heal_tests.rs"]
mod tests;
