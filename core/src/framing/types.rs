use std::fmt;
use std::io;

/// Fixed record header length.
///
/// ```text
/// [ magic (4) ][ version (1) ][ record_type (1) ][ iv_len (1) ]
/// [ ciphertext_len u32 (4) ][ crc32 u32 (4) ]
/// ```
pub const RECORD_HEADER_LEN: usize = 4 + 1 + 1 + 1 + 4 + 4;

/// Decoded fixed header, before the body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: u8,
    pub iv_len: u8,
    pub ciphertext_len: u32,
    pub crc32: u32,
}

impl RecordHeader {
    /// Body bytes following the header.
    pub fn body_len(&self) -> usize {
        self.iv_len as usize + self.ciphertext_len as usize
    }
}

#[derive(Debug)]
pub enum FrameError {
    InvalidMagic([u8; 4]),
    UnsupportedVersion(u8),
    InvalidRecordType(u8),
    InvalidIvLen(u8),
    RecordTooLarge { len: u32, max: u32 },
    ChecksumMismatch { expected: u32, actual: u32 },
    Truncated,
    Io(io::Error),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FrameError::*;
        match self {
            InvalidMagic(m) =>
                write!(f, "invalid record magic: {:?}", m),
            UnsupportedVersion(v) =>
                write!(f, "unsupported record version: {}", v),
            InvalidRecordType(v) =>
                write!(f, "invalid record type: 0x{:02x}", v),
            InvalidIvLen(v) =>
                write!(f, "invalid iv length: {}", v),
            RecordTooLarge { len, max } =>
                write!(f, "record too large: {} > {}", len, max),
            ChecksumMismatch { expected, actual } =>
                write!(f, "record checksum mismatch: expected {:08x}, got {:08x}", expected, actual),
            Truncated =>
                write!(f, "truncated record"),
            Io(e) =>
                write!(f, "record I/O error: {}", e),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<io::Error> for FrameError {
    fn from(e: io::Error) -> Self {
        FrameError::Io(e)
    }
}
