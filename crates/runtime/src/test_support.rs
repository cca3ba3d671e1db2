// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! Proptest strategies shared across `agentmc-runtime`'s property suite
//! (spec §8): arbitrary signal sequences for the dual-cursor invariants,
//! arbitrary payloads for chunk reassembly, arbitrary staleness windows
//! for the self-heal threshold property.

use agentmc_core::Sender;
use proptest::prelude::*;

pub fn arb_sender() -> impl Strategy<Value = Sender> {
    prop_oneof![Just(Sender::Agent), Just(Sender::Browser), Just(Sender::System)]
}

/// A strictly-increasing sequence of `(signal_id, sender)` pairs, built from
/// random positive deltas so every generated sequence is already in
/// arrival order — matching how a real Session Worker only ever sees ids
/// increase (spec §8 invariant 1: monotonicity is a precondition of the
/// sequence, not something `accept` enforces against out-of-order input).
pub fn arb_monotonic_signal_sequence(max_len: usize) -> impl Strategy<Value = Vec<(u64, Sender)>> {
    prop::collection::vec((1u64..=50, arb_sender()), 1..=max_len).prop_map(|deltas| {
        let mut id = 0u64;
        deltas
            .into_iter()
            .map(|(delta, sender)| {
                id += delta;
                (id, sender)
            })
            .collect()
    })
}

/// Arbitrary JSON payload shapes, spanning both "fits in one envelope" and
/// "needs chunking" sizes.
pub fn arb_json_payload() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,200}".prop_map(|text| serde_json::json!({"content": text})),
        "[a-zA-Z0-9]{20000,45000}".prop_map(|text| serde_json::json!({"content": text})),
    ]
}

/// Millisecond durations in a range realistic for self-heal thresholds
/// (1s–10min), used to build arbitrary `SelfHealThresholds`/timestamp
/// combinations.
pub fn arb_duration_ms(min: u64, max: u64) -> impl Strategy<Value = std::time::Duration> {
    (min..=max).prop_map(std::time::Duration::from_millis)
}
