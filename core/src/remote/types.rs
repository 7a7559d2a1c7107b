use std::fmt;
use std::io;
use std::path::Path;

use crate::crypto::FileDigest;

#[derive(Debug)]
pub enum RemoteError {
    Io(io::Error),
    InvalidKey(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Io(e) => write!(f, "remote I/O error: {}", e),
            RemoteError::InvalidKey(k) => write!(f, "invalid remote key: {:?}", k),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<io::Error> for RemoteError {
    fn from(e: io::Error) -> Self {
        RemoteError::Io(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCheck {
    Present,
    Missing,
    Mismatch { actual: FileDigest },
}

/// Off-box store for published parts, keyed by part file name.
pub trait RemoteStore: Send + Sync {
    fn upload(&self, path: &Path, key: &str) -> Result<(), RemoteError>;
    fn verify(&self, key: &str, expected: &FileDigest) -> Result<RemoteCheck, RemoteError>;
    fn list_keys(&self) -> Result<Vec<String>, RemoteError>;
}
