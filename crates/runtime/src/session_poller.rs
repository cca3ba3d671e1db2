// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Session Poller: discovers `requested` sessions for the agent and spawns
//! one Session Worker per new session id (spec §4.2).

use agentmc_core::{ErrorSink, RuntimeError, RuntimeErrorKind, Session, SessionId};
use agentmc_hub::HubApi;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const LOG_RATE_LIMIT: Duration = Duration::from_secs(5);

/// Sorts by id descending, matching the spec's "newest first" spawn order.
pub fn sort_sessions_descending(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.id.cmp(&a.id));
}

/// Sessions present in `sessions` that aren't already in `known`, in the
/// order given (caller is expected to have already sorted descending).
pub fn new_session_ids(sessions: &[Session], known: &HashSet<SessionId>) -> Vec<SessionId> {
    sessions.iter().map(|s| s.id).filter(|id| !known.contains(id)).collect()
}

/// Suppresses repeated log lines for the same condition to at most one per
/// `LOG_RATE_LIMIT` window.
struct LogRateLimiter {
    last_logged: Option<Instant>,
}

impl LogRateLimiter {
    fn new() -> Self {
        Self { last_logged: None }
    }

    fn should_log(&mut self, now: Instant) -> bool {
        let due = self.last_logged.is_none_or(|last| now.duration_since(last) >= LOG_RATE_LIMIT);
        if due {
            self.last_logged = Some(now);
        }
        due
    }
}

/// Runs the poll loop until `shutdown` resolves. Newly discovered session
/// ids are sent on `spawn_tx`; the loop never exits on a Hub error, only on
/// shutdown.
pub async fn run(
    hub: &dyn HubApi,
    list_limit: u32,
    poll_interval: Duration,
    backoff: Duration,
    spawn_tx: mpsc::UnboundedSender<Session>,
    error_sink: &dyn ErrorSink,
    mut shutdown: tokio::sync::oneshot::Receiver<()>,
) {
    let mut known = HashSet::new();
    let mut rate_limiter = LogRateLimiter::new();
    let mut next_delay = poll_interval;

    loop {
        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(next_delay) => {}
        }

        match hub.list_requested_sessions(list_limit).await {
            Ok(response) => {
                next_delay = poll_interval;
                let mut sessions = response.sessions;
                sort_sessions_descending(&mut sessions);
                for id in new_session_ids(&sessions, &known) {
                    known.insert(id);
                    if let Some(session) = sessions.iter().find(|s| s.id == id) {
                        if spawn_tx.send(session.clone()).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(err) if err.is_rate_limited() => {
                next_delay = backoff;
                if rate_limiter.should_log(Instant::now()) {
                    error_sink.report(RuntimeError::new(
                        RuntimeErrorKind::RateLimited,
                        "session_poller",
                        format!("rate limited, backing off to {backoff:?}: {err}"),
                    ));
                }
            }
            Err(err) => {
                next_delay = poll_interval;
                error_sink.report(RuntimeError::new(
                    RuntimeErrorKind::TransientNetwork,
                    "session_poller",
                    err.to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "session_poller_tests.rs"]
mod tests;
