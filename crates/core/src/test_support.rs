// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Proptest strategies shared across crates' test suites.

use crate::{Sender, SessionId, SignalMessage, TaggedValue};
use proptest::prelude::*;

pub fn arb_sender() -> impl Strategy<Value = Sender> {
    prop_oneof![Just(Sender::Agent), Just(Sender::Browser), Just(Sender::System)]
}

/// A signal with a given `id`/`sender`, fixed session, and an empty-object
/// payload — enough shape for ordering/cursor property tests that don't
/// care about payload contents.
pub fn signal_with(id: u64, sender: Sender) -> SignalMessage {
    SignalMessage {
        id,
        session_id: SessionId::from(1),
        sender,
        signal_type: "message".to_string(),
        payload: TaggedValue::object([]),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}
