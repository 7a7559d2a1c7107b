use byteorder::{ByteOrder, LittleEndian};

use crate::codec::{EncryptedRecord, RecordType};
use crate::constants::{RECORD_MAGIC, RECORD_VERSION};
use crate::crypto::NONCE_LEN_12;
use crate::framing::types::{FrameError, RecordHeader, RECORD_HEADER_LEN};
use crate::utils::compute_crc32_parts;

/// Parse and validate the fixed header. `max_len` bounds the ciphertext so the
/// body buffer is never allocated from an untrusted length.
pub fn parse_record_header(wire: &[u8], max_len: u32) -> Result<RecordHeader, FrameError> {
    if wire.len() < RECORD_HEADER_LEN {
        return Err(FrameError::Truncated);
    }

    let mut off = 0;

    let magic = &wire[off..off + 4];
    off += 4;
    if magic != RECORD_MAGIC {
        let mut m = [0u8; 4];
        m.copy_from_slice(magic);
        return Err(FrameError::InvalidMagic(m));
    }

    let version = wire[off];
    off += 1;
    if version != RECORD_VERSION {
        return Err(FrameError::UnsupportedVersion(version));
    }

    let record_type = wire[off];
    off += 1;
    RecordType::try_from(record_type).map_err(|_| FrameError::InvalidRecordType(record_type))?;

    let iv_len = wire[off];
    off += 1;
    if iv_len as usize != NONCE_LEN_12 {
        return Err(FrameError::InvalidIvLen(iv_len));
    }

    let ciphertext_len = LittleEndian::read_u32(&wire[off..off + 4]);
    off += 4;
    if ciphertext_len > max_len {
        return Err(FrameError::RecordTooLarge { len: ciphertext_len, max: max_len });
    }

    let crc32 = LittleEndian::read_u32(&wire[off..off + 4]);

    Ok(RecordHeader { record_type, iv_len, ciphertext_len, crc32 })
}

/// Build a record from a validated header and its body bytes.
pub fn decode_record_body(header: &RecordHeader, body: &[u8]) -> Result<EncryptedRecord, FrameError> {
    if body.len() != header.body_len() {
        return Err(FrameError::Truncated);
    }

    let (iv_bytes, ciphertext) = body.split_at(header.iv_len as usize);
    let actual = compute_crc32_parts(&[iv_bytes, ciphertext]);
    if actual != header.crc32 {
        return Err(FrameError::ChecksumMismatch { expected: header.crc32, actual });
    }

    let record_type = RecordType::try_from(header.record_type)
        .map_err(|_| FrameError::InvalidRecordType(header.record_type))?;
    let mut iv = [0u8; NONCE_LEN_12];
    iv.copy_from_slice(iv_bytes);

    Ok(EncryptedRecord { record_type, iv, ciphertext: ciphertext.to_vec() })
}

/// Decode one complete record from a byte slice.
pub fn decode_record(wire: &[u8], max_len: u32) -> Result<EncryptedRecord, FrameError> {
    let header = parse_record_header(wire, max_len)?;
    decode_record_body(&header, &wire[RECORD_HEADER_LEN..])
}
