//! Deflate (zlib wrapper) via flate2, one zlib stream per chunk.

use std::io::Read;
use std::io::Write;
use flate2::{Compression, write::ZlibEncoder, read::ZlibDecoder};

use crate::compression::{compute_checksum, split_framed_payload, verify_checksum};
use crate::compression::types::{Compressor, Decompressor, CompressionError};
use crate::constants::MAX_CHUNK_SIZE;

pub struct DeflateCompressor {
    level: Compression,
}

impl DeflateCompressor {
    pub fn new(level: i32) -> Result<Box<dyn Compressor>, CompressionError> {
        let lvl = match level {
            0..=9 => Compression::new(level as u32),
            _ => Compression::default(),
        };
        Ok(Box::new(Self { level: lvl }))
    }
}

impl Compressor for DeflateCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let mut enc = ZlibEncoder::new(Vec::new(), self.level);
        enc.write_all(input)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "deflate".into(), msg: e.to_string() })?;
        let compressed = enc.finish()
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "deflate".into(), msg: e.to_string() })?;

        let orig_len = input.len() as u32;
        out.extend_from_slice(&orig_len.to_le_bytes());
        out.extend_from_slice(&compressed);
        out.extend_from_slice(&compute_checksum(input).to_le_bytes());

        Ok(())
    }
}

pub struct DeflateDecompressor;

impl DeflateDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor>, CompressionError> {
        Ok(Box::new(Self))
    }
}

impl Decompressor for DeflateDecompressor {
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let (orig_len, compressed, expected_crc) = split_framed_payload(input, "deflate")?;

        if orig_len > MAX_CHUNK_SIZE {
            return Err(CompressionError::ChunkTooLarge { have: orig_len, max: MAX_CHUNK_SIZE });
        }

        // Bound the decoder so a hostile stream cannot inflate past the prefix.
        let mut dec = ZlibDecoder::new(compressed).take(orig_len as u64 + 1);
        let mut decompressed = Vec::with_capacity(orig_len);
        dec.read_to_end(&mut decompressed)
            .map_err(|e| CompressionError::CodecProcessFailed { codec: "deflate".into(), msg: e.to_string() })?;

        if decompressed.len() != orig_len {
            return Err(CompressionError::CodecProcessFailed {
                codec: "deflate".into(),
                msg: format!("decoded size {} != prefix {}", decompressed.len(), orig_len),
            });
        }

        verify_checksum(expected_crc, compute_checksum(&decompressed), "deflate")?;

        out.extend_from_slice(&decompressed);
        Ok(())
    }
}
