// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! AgentMC Runtime Supervisor daemon library.
//!
//! Discovers one or more Hub API credentials from the process environment,
//! bootstraps an Agent Runtime per credential, and runs them all to
//! completion or until a shared shutdown signal fires.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bootstrap;
pub mod credential;
pub mod env;

use agentmc_core::{RuntimeError, RuntimeErrorKind};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Discovers all configured credentials, bootstraps an Agent Runtime for
/// each, and runs them concurrently until `shutdown` fires, broadcasting the
/// signal to every running supervisor.
///
/// Returns an error only when no credential could be found or not a single
/// Agent Runtime could be bootstrapped; partial bootstrap failures (one of
/// several agents failing to start) are logged and the remaining agents
/// still run.
pub async fn run(shutdown: oneshot::Receiver<()>) -> Result<(), RuntimeError> {
    let credentials = credential::discover_from_process_env();
    if credentials.is_empty() {
        return Err(RuntimeError::new(
            RuntimeErrorKind::Configuration,
            "daemon",
            "no AGENTMC_API_KEY or AGENTMC_API_KEY_<id> credential was found",
        ));
    }

    info!(agent_count = credentials.len(), "discovered agent credentials");

    let mut runtimes = Vec::new();
    for credential in credentials {
        let suffix = credential.key_suffix.clone();
        match bootstrap::bootstrap_agent(credential).await {
            Ok(runtime) => runtimes.push(runtime),
            Err(err) => warn!(agent = %suffix, error = %err, "failed to bootstrap agent, skipping"),
        }
    }

    if runtimes.is_empty() {
        return Err(RuntimeError::new(
            RuntimeErrorKind::Configuration,
            "daemon",
            "every discovered credential failed to bootstrap",
        ));
    }

    let (broadcast_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let mut tasks = Vec::new();
    for runtime in runtimes {
        let mut agent_shutdown_rx = broadcast_tx.subscribe();
        let (task_shutdown_tx, task_shutdown_rx) = oneshot::channel();
        tasks.push(tokio::spawn(async move {
            let suffix = runtime.agent_key_suffix.clone();
            info!(agent = %suffix, "starting agent runtime");
            runtime.supervisor.run(task_shutdown_rx).await;
            info!(agent = %suffix, "agent runtime stopped");
        }));
        tokio::spawn(async move {
            if agent_shutdown_rx.recv().await.is_ok() {
                let _ = task_shutdown_tx.send(());
            }
        });
    }

    if shutdown.await.is_ok() {
        info!("shutdown requested, stopping all agent runtimes");
    }
    let _ = broadcast_tx.send(());

    for task in tasks {
        if let Err(err) = task.await {
            error!(error = %err, "agent runtime task panicked");
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
