//! src/crypto/aead.rs
//! AEAD interface for AES-256-GCM and ChaCha20-Poly1305.
//!
//! Design notes:
//! - Both ciphers use 32-byte keys and 12-byte nonces.
//! - Tag verification must fail closed (no partial plaintext).
//! - Caller provides the IV and AAD per record.

use crate::crypto::types::{CipherSuite, CryptoError, KEY_LEN_32, NONCE_LEN_12, TAG_LEN};

use aes_gcm::aead::{Aead, KeyInit, Payload};

use aes_gcm::{Aes256Gcm, Nonce as AesNonce};
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaNonce};

/// Unified AEAD cipher implementation selected by cipher suite.
#[derive(Clone)]
pub enum AeadImpl {
    AesGcm(Aes256Gcm),
    ChaCha(ChaCha20Poly1305),
}

impl AeadImpl {
    /// Construct the AEAD for `suite` from a derived 32-byte key.
    pub fn new(suite: CipherSuite, key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN_32 {
            return Err(CryptoError::InvalidKeyLen {
                expected: KEY_LEN_32,
                actual: key.len(),
            });
        }

        let bad_len = |_| CryptoError::InvalidKeyLen { expected: KEY_LEN_32, actual: key.len() };
        match suite {
            CipherSuite::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(key).map_err(bad_len)?;
                Ok(Self::AesGcm(cipher))
            }
            CipherSuite::Chacha20Poly1305 => {
                let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(bad_len)?;
                Ok(Self::ChaCha(cipher))
            }
        }
    }

    /// AEAD seal (encrypt) plaintext with nonce and AAD.
    pub fn seal(
        &self,
        nonce_12: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_nonce(nonce_12)?;

        match self {
            AeadImpl::AesGcm(cipher) => {
                cipher
                    .encrypt(AesNonce::from_slice(nonce_12), Payload { msg: plaintext, aad })
                    .map_err(|_| CryptoError::Failure("AES-GCM seal failed".into()))
            }
            AeadImpl::ChaCha(cipher) => {
                cipher
                    .encrypt(ChaNonce::from_slice(nonce_12), Payload { msg: plaintext, aad })
                    .map_err(|_| CryptoError::Failure("ChaCha20-Poly1305 seal failed".into()))
            }
        }
    }

    /// AEAD open (decrypt) ciphertext with nonce and AAD.
    pub fn open(
        &self,
        nonce_12: &[u8],
        aad: &[u8],
        ciphertext_and_tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_nonce(nonce_12)?;

        if ciphertext_and_tag.len() < TAG_LEN {
            return Err(CryptoError::Failure("ciphertext too short".into()));
        }

        match self {
            AeadImpl::AesGcm(cipher) => {
                cipher
                    .decrypt(AesNonce::from_slice(nonce_12), Payload { msg: ciphertext_and_tag, aad })
                    .map_err(|_| CryptoError::TagMismatch)
            }
            AeadImpl::ChaCha(cipher) => {
                cipher
                    .decrypt(ChaNonce::from_slice(nonce_12), Payload { msg: ciphertext_and_tag, aad })
                    .map_err(|_| CryptoError::TagMismatch)
            }
        }
    }
}

#[inline]
fn check_nonce(nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() != NONCE_LEN_12 {
        return Err(CryptoError::InvalidNonceLen {
            expected: NONCE_LEN_12,
            actual: nonce.len(),
        });
    }
    Ok(())
}
