//! sender/ledger.rs
//! Record of what each transfer uploaded, kept next to the queue.
//!
//! Survives the sender process so `check_sent` can vouch for earlier runs.
//! Written after every upload (temp file, fsync, rename); a transfer only
//! counts once it is marked complete, so an interrupted run shows up as
//! unfinished rather than as a shorter stream.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::FileDigest;
use crate::types::BackupError;

const TEMP_PREFIX: &str = ".sent-ledger-";

/// One uploaded part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentPart {
    pub key: String,
    pub digest: FileDigest,
}

/// Latest attempt at one transfer label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentTransfer {
    pub stream: String,
    pub parts: Vec<SentPart>,
    pub complete: bool,
}

#[derive(Debug)]
pub struct SentLedger {
    path: PathBuf,
    transfers: BTreeMap<String, SentTransfer>,
}

impl SentLedger {
    /// Load `path`, or start empty when it does not exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, BackupError> {
        let path = path.into();
        let transfers = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                BackupError::Config(format!("unreadable sent ledger {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, transfers })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, label: &str) -> Option<&SentTransfer> {
        self.transfers.get(label)
    }

    pub fn transfers(&self) -> &BTreeMap<String, SentTransfer> {
        &self.transfers
    }

    /// A new attempt replaces whatever an earlier one recorded for `label`.
    pub fn begin(&mut self, label: &str, stream: &str) -> Result<(), BackupError> {
        self.transfers.insert(
            label.to_string(),
            SentTransfer { stream: stream.to_string(), ..SentTransfer::default() },
        );
        self.save()
    }

    pub fn record_part(&mut self, label: &str, part: SentPart) -> Result<(), BackupError> {
        self.transfers.entry(label.to_string()).or_default().parts.push(part);
        self.save()
    }

    pub fn complete(&mut self, label: &str) -> Result<(), BackupError> {
        if let Some(t) = self.transfers.get_mut(label) {
            t.complete = true;
        }
        self.save()
    }

    fn save(&self) -> Result<(), BackupError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), &self.transfers)?;
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| BackupError::Io(e.error))?;
        Ok(())
    }
}
