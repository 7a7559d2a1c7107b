//! telemetry/counters.rs
//! Mutable counters collected while parts are written and read.
//!
//! Summary: each writer/reader fills a local `TelemetryCounters` for one part and
//! merges it into the shared context once the part is closed.
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub parts_written: u64,
    pub parts_read: u64,
    pub records_written: u64,
    pub records_read: u64,
    pub bytes_plaintext: u64,
    pub bytes_compressed: u64,
    pub bytes_ciphertext: u64,
    pub bytes_file: u64,
    pub streams_sent: u64,
    pub streams_received: u64,
    pub parts_uploaded: u64,
    pub polls_empty: u64,
}

impl TelemetryCounters {
    /// Record one encoded record.
    ///
    /// - `pt_len`: plaintext chunk length
    /// - `comp_len`: compressed payload length (before encryption)
    /// - `ct_len`: ciphertext length including tag
    /// - `wire_len`: framed length written to the part file
    pub fn add_encoded_record(&mut self, pt_len: usize, comp_len: usize, ct_len: usize, wire_len: usize) {
        self.records_written += 1;
        self.bytes_plaintext += pt_len as u64;
        self.bytes_compressed += comp_len as u64;
        self.bytes_ciphertext += ct_len as u64;
        self.bytes_file += wire_len as u64;
    }

    /// Record one decoded record.
    pub fn add_decoded_record(&mut self, pt_len: usize, comp_len: usize, ct_len: usize) {
        self.records_read += 1;
        self.bytes_plaintext += pt_len as u64;
        self.bytes_compressed += comp_len as u64;
        self.bytes_ciphertext += ct_len as u64;
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        *self += other.clone();
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.parts_written    += rhs.parts_written;
        self.parts_read       += rhs.parts_read;
        self.records_written  += rhs.records_written;
        self.records_read     += rhs.records_read;

        self.bytes_plaintext  += rhs.bytes_plaintext;
        self.bytes_compressed += rhs.bytes_compressed;
        self.bytes_ciphertext += rhs.bytes_ciphertext;
        self.bytes_file       += rhs.bytes_file;

        self.streams_sent     += rhs.streams_sent;
        self.streams_received += rhs.streams_received;
        self.parts_uploaded   += rhs.parts_uploaded;
        self.polls_empty      += rhs.polls_empty;
    }
}
