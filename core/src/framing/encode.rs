use byteorder::{LittleEndian, WriteBytesExt};

use crate::codec::EncryptedRecord;
use crate::constants::{RECORD_MAGIC, RECORD_VERSION};
use crate::framing::types::{FrameError, RECORD_HEADER_LEN};
use crate::utils::compute_crc32_parts;

/// Encode one record into its wire form.
///
/// Layout:
///
/// ```text
/// [ magic (4) ]
/// [ version (1) ]
/// [ record_type (1) ]
/// [ iv_len (1) ]
/// [ ciphertext_len (4) ]
/// [ crc32 of iv+ciphertext (4) ]
/// [ iv (iv_len) ]
/// [ ciphertext (ciphertext_len) ]
/// ```
pub fn encode_record(record: &EncryptedRecord) -> Result<Vec<u8>, FrameError> {
    let ct_len = u32::try_from(record.ciphertext.len())
        .map_err(|_| FrameError::RecordTooLarge { len: u32::MAX, max: u32::MAX })?;
    let iv_len = record.iv.len() as u8;

    let mut out = Vec::with_capacity(RECORD_HEADER_LEN + record.iv.len() + record.ciphertext.len());

    // --- Header ---
    out.extend_from_slice(&RECORD_MAGIC);
    out.push(RECORD_VERSION);
    out.push(record.record_type as u8);
    out.push(iv_len);
    out.write_u32::<LittleEndian>(ct_len)?;
    out.write_u32::<LittleEndian>(compute_crc32_parts(&[&record.iv, &record.ciphertext]))?;

    // --- Body ---
    out.extend_from_slice(&record.iv);
    out.extend_from_slice(&record.ciphertext);

    Ok(out)
}
