//! parts/naming.rs
//! On-disk part file names.
//!
//! ```text
//! <stamp>_<escaped label>.part<NNNNNNNNNN>
//! ```
//!
//! - `stamp`: 20-digit UTC `YYYYMMDDhhmmssuuuuuu`, taken when the transfer starts.
//! - `label`: `dataset@name` (full) or `dataset@base->name` (incremental).
//! - Escaping percent-encodes every byte outside `[A-Za-z0-9_:@-]`, so the
//!   escaped label never contains `.` and the part separator is unambiguous.
//! - The part number is zero-padded to ten digits, wide enough for any `u32`.
//! - Lexicographic file-name order is transfer order, then part order.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::constants::names::{PART_NUMBER_WIDTH, PART_SEPARATOR, STAMP_WIDTH};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartNameError {
    MissingSeparator(String),
    BadPartNumber(String),
    BadStamp(String),
    BadEscape(String),
}

impl fmt::Display for PartNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PartNameError::*;
        match self {
            MissingSeparator(s) => write!(f, "incorrect file part name {:?}: no part separator", s),
            BadPartNumber(s) => write!(f, "incorrect file part name {:?}: bad part number", s),
            BadStamp(s) => write!(f, "incorrect file part name {:?}: bad stream stamp", s),
            BadEscape(s) => write!(f, "incorrect file part name {:?}: bad escape", s),
        }
    }
}

impl std::error::Error for PartNameError {}

#[inline]
fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'@' | b'-')
}

pub fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for &b in label.as_bytes() {
        if is_plain(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

pub fn unescape_label(escaped: &str) -> Result<String, PartNameError> {
    let bad = || PartNameError::BadEscape(escaped.to_string());
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or_else(bad)?;
                if hex.iter().any(|b| b.is_ascii_lowercase()) {
                    return Err(bad());
                }
                let mut v = [0u8; 1];
                hex::decode_to_slice(hex, &mut v).map_err(|_| bad())?;
                // Only escaped bytes may appear escaped, keeping the mapping bijective.
                if is_plain(v[0]) {
                    return Err(bad());
                }
                out.push(v[0]);
                i += 3;
            }
            b if is_plain(b) => {
                out.push(b);
                i += 1;
            }
            _ => return Err(bad()),
        }
    }
    String::from_utf8(out).map_err(|_| bad())
}

/// Logical stream: one send process worth of parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamName {
    stamp: String,
    label: String,
}

impl StreamName {
    pub fn new(stamp: DateTime<Utc>, label: &str) -> Self {
        Self { stamp: format_stamp(stamp), label: label.to_string() }
    }

    pub fn for_full(stamp: DateTime<Utc>, snapshot: &Snapshot) -> Self {
        Self::new(stamp, snapshot.full_name())
    }

    pub fn for_incremental(stamp: DateTime<Utc>, base: &Snapshot, target: &Snapshot) -> Self {
        Self::new(stamp, &format!("{}@{}->{}", target.dataset(), base.name(), target.name()))
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Encoded form used in file names.
    pub fn encoded(&self) -> String {
        format!("{}_{}", self.stamp, escape_label(&self.label))
    }

    pub fn parse(encoded: &str) -> Result<Self, PartNameError> {
        let bad_stamp = || PartNameError::BadStamp(encoded.to_string());
        if encoded.len() <= STAMP_WIDTH || !encoded.is_char_boundary(STAMP_WIDTH) {
            return Err(bad_stamp());
        }
        let (stamp, rest) = encoded.split_at(STAMP_WIDTH);
        if !stamp.bytes().all(|b| b.is_ascii_digit()) || !rest.starts_with('_') {
            return Err(bad_stamp());
        }
        Ok(Self { stamp: stamp.to_string(), label: unescape_label(&rest[1..])? })
    }

    pub fn part(&self, part_number: u32) -> PartName {
        PartName { stream: self.clone(), part_number }
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded())
    }
}

pub fn format_stamp(t: DateTime<Utc>) -> String {
    t.format("%Y%m%d%H%M%S%6f").to_string()
}

/// Hands out strictly increasing stamps, at stamp resolution, even when the
/// wall clock stalls or steps back.
#[derive(Debug, Default)]
pub struct StampClock {
    last_micros: Option<i64>,
}

impl StampClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let micros = match self.last_micros {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last_micros = Some(micros);
        DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
    }
}

/// `(stream, part_number)` identity of one part file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartName {
    pub stream: StreamName,
    pub part_number: u32,
}

impl PartName {
    pub fn file_name(&self) -> String {
        format!(
            "{}{}{:0width$}",
            self.stream.encoded(),
            PART_SEPARATOR,
            self.part_number,
            width = PART_NUMBER_WIDTH
        )
    }

    pub fn parse(file_name: &str) -> Result<Self, PartNameError> {
        let idx = file_name
            .rfind(PART_SEPARATOR)
            .ok_or_else(|| PartNameError::MissingSeparator(file_name.to_string()))?;
        let digits = &file_name[idx + PART_SEPARATOR.len()..];
        if digits.len() != PART_NUMBER_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PartNameError::BadPartNumber(file_name.to_string()));
        }
        let part_number = digits
            .parse::<u32>()
            .map_err(|_| PartNameError::BadPartNumber(file_name.to_string()))?;
        let stream = StreamName::parse(&file_name[..idx])?;
        Ok(Self { stream, part_number })
    }

    /// The following part of the same stream; `None` once numbers run out.
    pub fn next(&self) -> Option<Self> {
        self.part_number.checked_add(1).map(|n| self.stream.part(n))
    }

    /// True when `self` directly follows `prev` in the same stream.
    pub fn follows(&self, prev: &PartName) -> bool {
        self.stream == prev.stream && prev.part_number.checked_add(1) == Some(self.part_number)
    }
}

impl fmt::Display for PartName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

impl Ord for PartName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file_name().cmp(&other.file_name())
    }
}

impl PartialOrd for PartName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
