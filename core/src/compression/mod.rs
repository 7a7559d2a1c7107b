//! compression/mod.rs
//! Per-chunk compression and decompression.
//!
//! Notes:
//! - Every chunk is compressed independently so a record can be decoded without
//!   its neighbours.
//! - Payloads carry the plaintext length and a CRC32 of the plaintext, so a
//!   malformed payload is detected here rather than by the receive process.
//! - Registry resolves codec IDs to implementations.

pub mod constants;
pub mod types;
pub mod registry;
pub mod codecs;

pub use constants::*;
pub use types::*;
pub use registry::*;

use crate::utils::compute_crc32;

#[inline]
pub fn compute_checksum(data: &[u8]) -> u32 {
    compute_crc32(data)
}

#[inline]
pub fn verify_checksum(expected: u32, actual: u32, codec: &str) -> Result<(), CompressionError> {
    if expected != actual {
        return Err(CompressionError::ChecksumMismatch {
            codec: codec.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Split `[orig_len u32 LE][body][crc32 u32 LE]` into its parts.
pub(crate) fn split_framed_payload<'a>(
    input: &'a [u8],
    codec: &str,
) -> Result<(usize, &'a [u8], u32), CompressionError> {
    if input.len() < 8 {
        return Err(CompressionError::CodecProcessFailed {
            codec: codec.into(),
            msg: "input too short for length+checksum".into(),
        });
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&input[0..4]);
    let orig_len = u32::from_le_bytes(len_bytes) as usize;

    let body = &input[4..input.len() - 4];

    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&input[input.len() - 4..]);
    let expected_crc = u32::from_le_bytes(crc_bytes);

    Ok((orig_len, body, expected_crc))
}
