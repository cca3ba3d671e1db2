// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The AgentMC Authors

//! SHA-256 helpers used for managed-file conflict detection.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`. Used both for on-disk file hashes and the
/// "absent" sentinel (the hash of an empty body) compared against a client's
/// `base_hash` on `file.save`/`file.delete`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Hash representing a file that does not exist on disk.
pub fn absent_hash() -> String {
    sha256_hex(b"")
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
