// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! `agentmc` — process entry point for the AgentMC Runtime Supervisor.
//!
//! Discovers credentials from the environment, runs one Agent Runtime per
//! credential, and shuts down cleanly on SIGINT/SIGTERM.

mod exit_error;

use clap::Parser;
use exit_error::ExitError;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "agentmc",
    version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    about = "AgentMC Runtime Supervisor: bridges a local Engine to the AgentMC Hub"
)]
struct Cli;

fn main() {
    Cli::parse();
    setup_logging();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

async fn run() -> Result<(), ExitError> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    agentmc_daemon::run(shutdown_rx).await?;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(_) => return wait_ctrl_c_only().await,
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(_) => return wait_ctrl_c_only().await,
    };

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

async fn wait_ctrl_c_only() {
    let _ = tokio::signal::ctrl_c().await;
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
