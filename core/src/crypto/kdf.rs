//! crypto/kdf.rs
//! HKDF-based record key derivation from the configured password.
//!
//! Design:
//! - HKDF-Extract(password, fixed application salt) -> PRK
//! - HKDF-Expand(PRK, info = prefix || cipher id) -> 32-byte key
//!
//! Industry notes:
//! - Sender and receiver only share the password, so the salt is fixed rather
//!   than stored per stream. Binding the cipher id into `info` gives each suite
//!   its own key.

use crate::constants::kdf_context;
use crate::crypto::types::{CipherSuite, CryptoError, KEY_LEN_32};

use hkdf::Hkdf;
use sha2::Sha256;

#[inline]
fn build_info(suite: CipherSuite) -> Vec<u8> {
    let mut info = Vec::with_capacity(kdf_context::INFO_PREFIX.len() + 2);
    info.extend_from_slice(kdf_context::INFO_PREFIX);
    info.extend_from_slice(&suite.id().to_le_bytes());
    info
}

/// Summary: Derive the 32-byte record key for `suite` from `password`.
///
/// Errors:
/// - Empty password returns CryptoError::Failure.
pub fn derive_key_from_password(
    password: &[u8],
    suite: CipherSuite,
) -> Result<[u8; KEY_LEN_32], CryptoError> {
    if password.is_empty() {
        return Err(CryptoError::Failure("password must not be empty".into()));
    }

    let hk = Hkdf::<Sha256>::new(Some(kdf_context::SALT), password);
    let mut key = [0u8; KEY_LEN_32];
    hk.expand(&build_info(suite), &mut key)
        .map_err(|_| CryptoError::Failure("HKDF expand failed (SHA-256)".into()))?;
    Ok(key)
}
