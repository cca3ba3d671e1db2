// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentmc-core: shared domain types for the AgentMC runtime supervisor.

pub mod clock;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod hash;
pub mod ids;
pub mod session;
pub mod signal;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dedupe::ProcessedKeyCache;
pub use engine::{AgentProfile, EngineKind, EngineProvider, Identity};
pub use error::{ErrorSink, ProtocolError, RuntimeError, RuntimeErrorKind, TracingErrorSink};
pub use hash::sha256_hex;
pub use ids::{new_chunk_id, new_request_id, new_run_id, short, AgentId, RequestId, RunId, SessionId};
pub use session::{ConnectionState, RuntimeState, Session, SocketAuth};
pub use signal::{Sender, SignalMessage};
pub use value::TaggedValue;
