//! compression/types.rs
//! Codec identifiers, errors, and the per-chunk codec traits.
use std::fmt;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::compression::constants::codec_ids;
use crate::utils::enum_name_or_hex;

/// Compression codec identifiers.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    Stored  = codec_ids::STORED,
    Zstd    = codec_ids::ZSTD,
    Lz4     = codec_ids::LZ4,
    Deflate = codec_ids::DEFLATE,
}

impl CompressionCodec {
    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionCodec::Stored  => "stored",
            CompressionCodec::Zstd    => "zstd",
            CompressionCodec::Lz4     => "lz4",
            CompressionCodec::Deflate => "deflate",
        }
    }
}

impl Default for CompressionCodec {
    fn default() -> Self {
        CompressionCodec::Deflate
    }
}

#[derive(Debug)]
pub enum CompressionError {
    UnsupportedCodec { codec_id: u16 },
    CodecInitFailed { codec: String, msg: String },
    CodecProcessFailed { codec: String, msg: String },
    ChecksumMismatch { codec: String, expected: u32, actual: u32 },
    ChunkTooLarge { have: usize, max: usize },
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CompressionError::*;
        match self {
            UnsupportedCodec { codec_id } =>
                write!(f, "unsupported compression codec: {}",
                       enum_name_or_hex::<CompressionCodec>(*codec_id)),
            CodecInitFailed { codec, msg } =>
                write!(f, "codec {} init failed: {}", codec, msg),
            CodecProcessFailed { codec, msg } =>
                write!(f, "codec {} process failed: {}", codec, msg),
            ChecksumMismatch { codec, expected, actual } =>
                write!(f, "codec {} checksum mismatch: expected {:08x}, got {:08x}", codec, expected, actual),
            ChunkTooLarge { have, max } =>
                write!(f, "chunk too large: {} > {}", have, max),
        }
    }
}

impl std::error::Error for CompressionError {}

// Require Send so codecs can move with the writer/reader into worker threads.
pub trait Compressor: Send {
    /// Compress a single chunk, appending the self-describing payload to `out`.
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
}

pub trait Decompressor: Send {
    /// Decompress one payload produced by the matching `Compressor`.
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
}
