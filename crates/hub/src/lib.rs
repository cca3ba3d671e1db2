// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentmc-hub: typed HTTPS client for the Hub control-plane REST surface
//! (spec §4.1, §6).

pub mod client;
pub mod error;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use client::{HttpHubClient, HubApi};
pub use error::HubError;
