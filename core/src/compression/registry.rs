//! compression/registry.rs
//! Codec registry and factory functions.

use crate::compression::constants::{codec_ids, DEFAULT_LEVEL_DEFLATE, DEFAULT_LEVEL_LZ4, DEFAULT_LEVEL_ZSTD};
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};
use crate::compression::codecs::{deflate, lz4, stored, zstd};

pub struct CodecInfo {
    pub name: &'static str,
    pub default_level: i32,
}

pub fn resolve(codec_id: u16) -> Result<CodecInfo, CompressionError> {
    match codec_id {
        x if x == codec_ids::STORED =>
            Ok(CodecInfo { name: "stored", default_level: 0 }),
        x if x == codec_ids::ZSTD =>
            Ok(CodecInfo { name: "zstd", default_level: DEFAULT_LEVEL_ZSTD }),
        x if x == codec_ids::LZ4 =>
            Ok(CodecInfo { name: "lz4", default_level: DEFAULT_LEVEL_LZ4 }),
        x if x == codec_ids::DEFLATE =>
            Ok(CodecInfo { name: "deflate", default_level: DEFAULT_LEVEL_DEFLATE }),
        other => Err(CompressionError::UnsupportedCodec { codec_id: other }),
    }
}

pub fn create_compressor(codec: CompressionCodec, level: Option<i32>)
    -> Result<Box<dyn Compressor>, CompressionError>
{
    let info = resolve(codec.id())?;
    let level = level.unwrap_or(info.default_level);
    match codec {
        CompressionCodec::Stored  => Ok(Box::new(stored::StoredCompressor::new())),
        CompressionCodec::Zstd    => zstd::ZstdCompressor::new(level),
        CompressionCodec::Lz4     => lz4::Lz4Compressor::new(level),
        CompressionCodec::Deflate => deflate::DeflateCompressor::new(level),
    }
}

pub fn create_decompressor(codec: CompressionCodec)
    -> Result<Box<dyn Decompressor>, CompressionError>
{
    match codec {
        CompressionCodec::Stored  => Ok(Box::new(stored::StoredDecompressor::new())),
        CompressionCodec::Zstd    => zstd::ZstdDecompressor::new(),
        CompressionCodec::Lz4     => lz4::Lz4Decompressor::new(),
        CompressionCodec::Deflate => deflate::DeflateDecompressor::new(),
    }
}
