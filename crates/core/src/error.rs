// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Shared runtime error taxonomy, surfaced to the injected error sink rather
//! than propagated out of a session or supervisor task (see spec §7).

use thiserror::Error;

/// Coarse classification used to decide whether a failure is fatal at
/// bootstrap, worth a retry on the next tick, or purely observational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    Configuration,
    TransientNetwork,
    RateLimited,
    SessionGone,
    Auth,
    Subprocess,
    Protocol,
}

/// A runtime error tagged with its category and the component it originated
/// in, suitable for routing to an `ErrorSink`.
#[derive(Debug, Error)]
#[error("[{kind:?}] {component}: {message}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub component: &'static str,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, component: &'static str, message: impl Into<String>) -> Self {
        Self { kind, component, message: message.into() }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, RuntimeErrorKind::Configuration)
    }
}

/// Protocol-level failures surfaced back to the Hub/browser as part of a
/// response payload rather than logged — file.save conflicts, empty chat
/// text, unknown doc ids. `code` is the wire-facing string named in spec §4.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ProtocolError {
    pub code: &'static str,
    pub message: String,
}

impl ProtocolError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Reports a `RuntimeError` without propagating it out of the task that
/// produced it (the "error barrier" in spec §7). Implementations typically
/// log via `tracing::error!` and optionally forward to an external sink.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: RuntimeError);
}

impl<F: Fn(RuntimeError) + Send + Sync> ErrorSink for F {
    fn report(&self, error: RuntimeError) {
        self(error)
    }
}

/// An `ErrorSink` that logs via `tracing::error!` and drops the error.
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, error: RuntimeError) {
        tracing::error!(kind = ?error.kind, component = error.component, message = %error.message, "runtime error");
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
