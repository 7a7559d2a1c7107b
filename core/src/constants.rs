//! constants.rs
//! Stable wire identifiers, defaults, and on-disk names.

use std::time::Duration;

/// Magic number for one framed record.
/// "SSR1" = Snapship Record v1
pub const RECORD_MAGIC: [u8; 4] = *b"SSR1";
pub const RECORD_VERSION: u8 = 1;

/// Defaults when the config leaves them out.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KiB
pub const DEFAULT_FILE_PART_SIZE: u64 = 512 * 1024 * 1024; // 512 MiB

/// Max chunk size sanity bound (32 MiB).
pub const MAX_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Upper bound for a single record's ciphertext on read.
/// Compression of incompressible data can grow a chunk slightly (lz4 worst case
/// is about n/255), so leave headroom.
pub const DEFAULT_MAX_RECORD_LEN: u32 = (MAX_CHUNK_SIZE + MAX_CHUNK_SIZE / 64) as u32;

/// Fixed bytes a record adds on top of the compressed payload:
/// length prefix, CRC, and AEAD tag.
pub const RECORD_FIXED_OVERHEAD: usize = 4 + 4 + 16;

/// Receiver backoff between empty polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Queue directory names.
pub mod names {
    /// Sentinel: no more parts will ever be produced for this pool.
    pub const FINISHED_MARKER: &str = "finished";
    /// Separator between stream name and part number.
    pub const PART_SEPARATOR: &str = ".part";
    /// Width of the zero-padded part number; fits every `u32`.
    pub const PART_NUMBER_WIDTH: usize = 10;
    /// Sender-side staging suffix (never consumed).
    pub const STAGING_SUFFIX: &str = ".partial";
    /// Terminal state when parts are kept after receive.
    pub const RECEIVED_SUFFIX: &str = ".received";
    /// Arrival suffix used by mirrors that download into the queue.
    pub const READY_SUFFIX: &str = ".ready";
    /// Sender-side record of uploaded parts. Dot-prefixed, so polling skips it.
    pub const SENT_LEDGER: &str = ".sent-ledger.json";
    /// Width of the UTC stamp prefixed to every stream name.
    pub const STAMP_WIDTH: usize = 20;
}

/// Cipher suite identifiers.
pub mod cipher_ids {
    pub const AES256_GCM: u16        = 0x0001;
    pub const CHACHA20_POLY1305: u16 = 0x0002;
}

/// Record type tags.
pub mod record_types {
    pub const DATA: u8 = 0x01;
}

/// Key derivation context. Changing either value invalidates every archive.
pub mod kdf_context {
    pub const SALT: &[u8] = b"snapship/v1/part-key-salt";
    pub const INFO_PREFIX: &[u8] = b"snapship|record-key|";
}
