// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentmc-runtime: the Supervisor Loop, Session Poller, Session Worker,
//! Instruction Syncer, Heartbeat Emitter, and Recurring-Task Executor
//! (spec §4.1–§4.9) — the orchestration layer built on top of
//! `agentmc-hub`, `agentmc-adapters`, and `agentmc-storage`.

pub mod chat;
pub mod config;
pub mod context_block;
pub mod dedupe_keys;
pub mod heartbeat;
pub mod instruction_sync;
pub mod managed_files;
pub mod notification;
pub mod recurring;
pub mod router;
pub mod self_heal;
pub mod session_poller;
pub mod session_worker;
pub mod supervisor;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;


pub use config::RuntimeConfig;
pub use supervisor::SupervisorLoop;
