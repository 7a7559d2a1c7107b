//! config.rs
//! Deployment-wide settings shared by the sender and the receiver.
//!
//! Loaded from JSON; every field has a default so a config file only needs the
//! password. Durations are written as milliseconds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compression::CompressionCodec;
use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_FILE_PART_SIZE, DEFAULT_MAX_RECORD_LEN, DEFAULT_POLL_INTERVAL,
    MAX_CHUNK_SIZE, RECORD_FIXED_OVERHEAD,
};
use crate::crypto::{CipherSuite, DigestAlg};
use crate::types::BackupError;

/// When a part's digest is computed relative to its upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashTiming {
    /// Digest the part when it closes, re-check the file right before upload.
    AtClose,
    /// Digest once, at upload time.
    AtUpload,
}

impl Default for HashTiming {
    fn default() -> Self {
        HashTiming::AtClose
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub chunk_size: usize,
    pub file_part_size: u64,
    pub password: String,
    pub codec: CompressionCodec,
    pub cipher: CipherSuite,
    pub digest: DigestAlg,
    pub delete_after_receive: bool,
    /// Per-dataset multi-incremental sends instead of one send per snapshot pair.
    pub multi_incremental: bool,
    /// Upload every published part to the remote store.
    pub load_remote: bool,
    pub hash_timing: HashTiming,
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    #[serde(with = "opt_duration_ms")]
    pub idle_timeout: Option<Duration>,
    pub max_record_len: u32,
    pub root_dataset: String,
    pub target_pool: String,
    /// Write the `finished` sentinel after a backup run.
    pub create_finished_marker: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            file_part_size: DEFAULT_FILE_PART_SIZE,
            password: String::new(),
            codec: CompressionCodec::default(),
            cipher: CipherSuite::default(),
            digest: DigestAlg::default(),
            delete_after_receive: true,
            multi_incremental: false,
            load_remote: false,
            hash_timing: HashTiming::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            idle_timeout: None,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            root_dataset: String::new(),
            target_pool: String::new(),
            create_finished_marker: false,
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, BackupError> {
        let cfg: Config = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, BackupError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), BackupError> {
        if self.chunk_size == 0 {
            return Err(BackupError::Config("chunk_size must be > 0".into()));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(BackupError::Config(format!(
                "chunk_size {} exceeds maximum {}", self.chunk_size, MAX_CHUNK_SIZE
            )));
        }
        if self.file_part_size == 0 {
            return Err(BackupError::Config("file_part_size must be > 0".into()));
        }
        if self.password.is_empty() {
            return Err(BackupError::Config("password must not be empty".into()));
        }
        if (self.max_record_len as usize) < self.chunk_size + RECORD_FIXED_OVERHEAD {
            return Err(BackupError::Config(format!(
                "max_record_len {} cannot hold a {} byte chunk", self.max_record_len, self.chunk_size
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(BackupError::Config("poll_interval must be > 0".into()));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod opt_duration_ms {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
