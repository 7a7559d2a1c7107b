//! framing/channel.rs
//! Sequential record writer/reader over any byte stream.

use std::io::{Read, Write};

use crate::codec::EncryptedRecord;
use crate::constants::DEFAULT_MAX_RECORD_LEN;
use crate::framing::decode::{decode_record_body, parse_record_header};
use crate::framing::encode::encode_record;
use crate::framing::types::{FrameError, RECORD_HEADER_LEN};
use crate::utils::read_exact_or_eof;

pub struct RecordWriter<W: Write> {
    inner: W,
    records: u64,
    bytes: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, records: 0, bytes: 0 }
    }

    /// Append one record; returns the encoded length.
    pub fn write_record(&mut self, record: &EncryptedRecord) -> Result<usize, FrameError> {
        let wire = encode_record(record)?;
        self.inner.write_all(&wire)?;
        self.records += 1;
        self.bytes += wire.len() as u64;
        Ok(wire.len())
    }

    pub fn flush(&mut self) -> Result<(), FrameError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

pub struct RecordReader<R: Read> {
    inner: R,
    max_record_len: u32,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_record_len(inner, DEFAULT_MAX_RECORD_LEN)
    }

    pub fn with_max_record_len(inner: R, max_record_len: u32) -> Self {
        Self { inner, max_record_len }
    }

    /// Next record, or `None` at a clean end of stream.
    ///
    /// EOF inside a header or body is `Truncated`.
    pub fn read_record(&mut self) -> Result<Option<EncryptedRecord>, FrameError> {
        let header_bytes = read_exact_or_eof(&mut self.inner, RECORD_HEADER_LEN)?;
        if header_bytes.is_empty() {
            return Ok(None);
        }
        if header_bytes.len() < RECORD_HEADER_LEN {
            return Err(FrameError::Truncated);
        }

        let header = parse_record_header(&header_bytes, self.max_record_len)?;

        let body = read_exact_or_eof(&mut self.inner, header.body_len())?;
        if body.len() < header.body_len() {
            return Err(FrameError::Truncated);
        }

        decode_record_body(&header, &body).map(Some)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<EncryptedRecord, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
