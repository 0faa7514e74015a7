//! Stable record-id hashing for deterministic per-record choices.
//!
//! Greeting selection, live-greeting membership and follow-up gating all
//! depend only on the record id, never on run order or the sampling seed.

use sha2::{Digest, Sha256};

/// First eight bytes of SHA-256 over the id, big-endian.
pub fn stable_hash(id: &str) -> u64 {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// `stable_hash(id) mod k`. A zero `k` yields bucket 0.
pub fn bucket(id: &str, k: u64) -> u64 {
    if k == 0 {
        return 0;
    }
    stable_hash(id) % k
}

/// Whether `id` falls in the first `rate` fraction of 100 buckets.
pub fn in_fraction(id: &str, rate: f64) -> bool {
    let threshold = (rate.clamp(0.0, 1.0) * 100.0) as u64;
    bucket(id, 100) < threshold
}
