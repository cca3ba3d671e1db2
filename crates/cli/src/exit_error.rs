// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Custom error type that carries a process exit code.
//!
//! `main()` maps a fatal bootstrap error to a nonzero exit code this way
//! rather than calling `std::process::exit()` from inside the daemon.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<agentmc_core::RuntimeError> for ExitError {
    fn from(err: agentmc_core::RuntimeError) -> Self {
        Self::new(1, err.to_string())
    }
}
