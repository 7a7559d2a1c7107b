//! codec/mod.rs
//! Chunk codec: compress then encrypt one chunk into an `EncryptedRecord`.
//!
//! Summary: the key is derived once from the password at construction; every
//! record gets a fresh random IV. Records are independent, so any record can be
//! decoded on its own given the same password, cipher and compression codec.

pub mod types;

pub use types::*;

use crate::compression::{create_compressor, create_decompressor, CompressionCodec, Compressor, Decompressor};
use crate::constants::RECORD_VERSION;
use crate::crypto::{derive_key_from_password, random_iv, AeadImpl, CipherSuite, TAG_LEN};

/// AAD bound into every record: record type and format version.
#[inline]
fn record_aad(record_type: RecordType) -> [u8; 2] {
    [record_type as u8, RECORD_VERSION]
}

pub struct ChunkCodec {
    aead: AeadImpl,
    compression: CompressionCodec,
    compressor: Box<dyn Compressor>,
    decompressor: Box<dyn Decompressor>,
    scratch: Vec<u8>,
}

impl ChunkCodec {
    pub fn new(
        password: &str,
        cipher: CipherSuite,
        compression: CompressionCodec,
    ) -> Result<Self, CodecError> {
        let key = derive_key_from_password(password.as_bytes(), cipher)?;
        let aead = AeadImpl::new(cipher, &key)?;
        Ok(Self {
            aead,
            compression,
            compressor: create_compressor(compression, None)?,
            decompressor: create_decompressor(compression)?,
            scratch: Vec::new(),
        })
    }

    pub fn compression(&self) -> CompressionCodec {
        self.compression
    }

    /// Compress then encrypt one chunk.
    pub fn encode(&mut self, chunk: &[u8]) -> Result<EncryptedRecord, CodecError> {
        self.scratch.clear();
        self.compressor.compress_chunk(chunk, &mut self.scratch)?;

        let iv = random_iv();
        let ciphertext = self.aead.seal(&iv, &record_aad(RecordType::Data), &self.scratch)?;
        Ok(EncryptedRecord::data(iv, ciphertext))
    }

    /// Decrypt then decompress one record.
    pub fn decode(&mut self, record: &EncryptedRecord) -> Result<Vec<u8>, CodecError> {
        let compressed = self.aead.open(&record.iv, &record_aad(record.record_type), &record.ciphertext)?;

        let mut out = Vec::new();
        self.decompressor.decompress_chunk(&compressed, &mut out)?;
        Ok(out)
    }
}

/// Compressed payload length carried by a record (ciphertext minus tag).
#[inline]
pub fn compressed_len(record: &EncryptedRecord) -> usize {
    record.ciphertext.len().saturating_sub(TAG_LEN)
}
