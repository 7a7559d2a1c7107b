//! src/compression/codecs/zstd.rs
//!
//! Zstd per-chunk compressor/decompressor.
//!
//! Design notes:
//! - Uses the zstd block API (`zstd::bulk`), so each payload decompresses on its own.
//! - Errors are mapped into `CompressionError` variants with codec context.

use crate::compression::{compute_checksum, split_framed_payload, verify_checksum};
use crate::constants::MAX_CHUNK_SIZE;
use crate::compression::types::{CompressionError, Compressor, Decompressor};

pub struct ZstdCompressor {
    level: i32,
}

pub struct ZstdDecompressor;

impl ZstdCompressor {
    /// Create a new Zstd compressor with the given level.
    ///
    /// # Errors
    /// - Returns `CompressionError::CodecInitFailed` if the level is outside zstd's range.
    pub fn new(level: i32) -> Result<Box<dyn Compressor>, CompressionError> {
        let range = zstd::compression_level_range();
        if !range.contains(&level) {
            return Err(CompressionError::CodecInitFailed {
                codec: "zstd".into(),
                msg: format!("level {} outside {:?}", level, range),
            });
        }
        Ok(Box::new(Self { level }))
    }
}

impl Compressor for ZstdCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let compressed = zstd::bulk::compress(input, self.level)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "zstd".into(), msg: e.to_string() })?;

        // Prefix with original plaintext length
        let orig_len = input.len() as u32;
        out.extend_from_slice(&orig_len.to_le_bytes());
        out.extend_from_slice(&compressed);

        // Append CRC32 of original plaintext
        out.extend_from_slice(&compute_checksum(input).to_le_bytes());

        Ok(())
    }
}

impl ZstdDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for ZstdDecompressor {
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let (orig_len, compressed, expected_crc) = split_framed_payload(input, "zstd")?;

        if orig_len > MAX_CHUNK_SIZE {
            return Err(CompressionError::ChunkTooLarge { have: orig_len, max: MAX_CHUNK_SIZE });
        }

        // Decompress with known output size
        let decompressed = zstd::bulk::decompress(compressed, orig_len)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "zstd".into(), msg: e.to_string() })?;

        if decompressed.len() != orig_len {
            return Err(CompressionError::CodecProcessFailed {
                codec: "zstd".into(),
                msg: format!("decoded size {} != prefix {}", decompressed.len(), orig_len),
            });
        }

        verify_checksum(expected_crc, compute_checksum(&decompressed), "zstd")?;

        out.extend_from_slice(&decompressed);
        Ok(())
    }
}
