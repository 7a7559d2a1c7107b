//! crypto/nonce.rs
//! Random per-record IVs.
//!
//! Records are encrypted independently and parts may be produced by separate
//! sender runs under the same key, so IVs come from the OS-seeded thread RNG
//! instead of a counter.

use rand::RngCore;

use crate::crypto::types::NONCE_LEN_12;

/// Fresh 12-byte IV for one record.
#[inline]
pub fn random_iv() -> [u8; NONCE_LEN_12] {
    let mut iv = [0u8; NONCE_LEN_12];
    rand::thread_rng().fill_bytes(&mut iv);
    iv
}
