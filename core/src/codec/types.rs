use std::fmt;
use num_enum::TryFromPrimitive;

use crate::compression::CompressionError;
use crate::constants::record_types;
use crate::crypto::{CryptoError, NONCE_LEN_12};

/// Record type tags carried in the frame header and bound into the AAD.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum RecordType {
    Data = record_types::DATA,
}

/// One encrypted chunk. The ciphertext carries the AEAD tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub record_type: RecordType,
    pub iv: [u8; NONCE_LEN_12],
    pub ciphertext: Vec<u8>,
}

impl EncryptedRecord {
    pub fn data(iv: [u8; NONCE_LEN_12], ciphertext: Vec<u8>) -> Self {
        Self { record_type: RecordType::Data, iv, ciphertext }
    }
}

#[derive(Debug)]
pub enum CodecError {
    Crypto(CryptoError),
    Compression(CompressionError),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Crypto(e) => write!(f, "encrypt error: {}", e),
            CodecError::Compression(e) => write!(f, "compression error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CryptoError> for CodecError {
    fn from(e: CryptoError) -> Self {
        CodecError::Crypto(e)
    }
}

impl From<CompressionError> for CodecError {
    fn from(e: CompressionError) -> Self {
        CodecError::Compression(e)
    }
}
