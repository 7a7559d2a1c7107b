//! codecs/stored.rs
//! Pass-through codec. Keeps the length and checksum framing of the real codecs.

use crate::compression::{compute_checksum, split_framed_payload, verify_checksum};
use crate::compression::types::{CompressionError, Compressor, Decompressor};

pub struct StoredCompressor;
pub struct StoredDecompressor;

impl StoredCompressor {
    pub fn new() -> Self { Self }
}
impl StoredDecompressor {
    pub fn new() -> Self { Self }
}

impl Compressor for StoredCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let orig_len = input.len() as u32;
        out.extend_from_slice(&orig_len.to_le_bytes());
        out.extend_from_slice(input);
        out.extend_from_slice(&compute_checksum(input).to_le_bytes());
        Ok(())
    }
}

impl Decompressor for StoredDecompressor {
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let (orig_len, body, expected_crc) = split_framed_payload(input, "stored")?;

        if body.len() != orig_len {
            return Err(CompressionError::CodecProcessFailed {
                codec: "stored".into(),
                msg: format!("stored size {} != prefix {}", body.len(), orig_len),
            });
        }

        verify_checksum(expected_crc, compute_checksum(body), "stored")?;
        out.extend_from_slice(body);
        Ok(())
    }
}
