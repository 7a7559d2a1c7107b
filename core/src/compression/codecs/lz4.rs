//! codecs/lz4.rs
//! LZ4 block compressor/decompressor (pure Rust, lz4_flex).
use lz4_flex::block::{compress_prepend_size, decompress};

use crate::compression::{compute_checksum, split_framed_payload, verify_checksum};
use crate::compression::types::{CompressionError, Compressor, Decompressor};
use crate::constants::MAX_CHUNK_SIZE;

/// LZ4 compressor using the block API.
/// Note: lz4_flex block mode has no levels, each chunk is compressed independently.
pub struct Lz4Compressor;

pub struct Lz4Decompressor;

impl Lz4Compressor {
    pub fn new(_level: i32) -> Result<Box<dyn Compressor>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Compressor for Lz4Compressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        // compress_prepend_size writes the u32 LE plaintext length first,
        // which lines up with the shared payload layout.
        out.extend_from_slice(&compress_prepend_size(input));

        // Append CRC32 of original input
        out.extend_from_slice(&compute_checksum(input).to_le_bytes());
        Ok(())
    }
}

impl Lz4Decompressor {
    pub fn new() -> Result<Box<dyn Decompressor>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for Lz4Decompressor {
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let (orig_len, compressed, expected_crc) = split_framed_payload(input, "lz4")?;

        if orig_len > MAX_CHUNK_SIZE {
            return Err(CompressionError::ChunkTooLarge { have: orig_len, max: MAX_CHUNK_SIZE });
        }

        let decompressed = decompress(compressed, orig_len)
            .map_err(|e| CompressionError::CodecProcessFailed {
                codec: "lz4".into(),
                msg: e.to_string(),
            })?;

        verify_checksum(expected_crc, compute_checksum(&decompressed), "lz4")?;

        out.extend_from_slice(&decompressed);
        Ok(())
    }
}
