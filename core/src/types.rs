use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    codec::CodecError,
    compression::CompressionError,
    crypto::CryptoError,
    framing::FrameError,
    parts::PartNameError,
    remote::RemoteError,
    snapshot::SnapshotError,
    zfs::ProcessError,
};

/// Unified error for senders, receivers, and drivers.
/// - `From<T>` impls let `?` cross module boundaries.
/// - Expected control-flow signals (no more parts, finished, size limit,
///   stream end) are return values, not errors.
#[derive(Debug)]
pub enum BackupError {
    Io(io::Error),

    Frame(FrameError),

    /// Key derivation, cipher, or tag failure.
    Crypto(CryptoError),

    Compression(CompressionError),

    /// File name does not follow the part naming convention.
    PartName(PartNameError),

    Snapshot(SnapshotError),

    Process(ProcessError),

    Remote(RemoteError),

    /// Two queue entries claim the same `(stream, part)` identity, or a
    /// stream outgrows the part number space.
    TooManyParts { part: String, paths: Vec<PathBuf> },

    IncorrectHash { path: PathBuf, expected: String, actual: String },

    /// Remote store lacks an artifact a previous run should have uploaded.
    S3MissesFile { key: String },

    InvalidArgument(String),

    Config(String),

    /// No part arrived within the configured idle timeout.
    Timeout { waited: Duration },
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupError::Io(e) => write!(f, "I/O error: {}", e),
            BackupError::Frame(e) => write!(f, "frame error: {}", e),
            BackupError::Crypto(e) => write!(f, "encrypt error: {}", e),
            BackupError::Compression(e) => write!(f, "compression error: {}", e),
            BackupError::PartName(e) => write!(f, "{}", e),
            BackupError::Snapshot(e) => write!(f, "snapshot error: {}", e),
            BackupError::Process(e) => write!(f, "process error: {}", e),
            BackupError::Remote(e) => write!(f, "remote store error: {}", e),
            BackupError::TooManyParts { part, paths } =>
                write!(f, "too many parts for {}: {:?}", part, paths),
            BackupError::IncorrectHash { path, expected, actual } =>
                write!(f, "incorrect hash for {}: expected {}, got {}", path.display(), expected, actual),
            BackupError::S3MissesFile { key } => write!(f, "remote store misses file {}", key),
            BackupError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            BackupError::Config(msg) => write!(f, "config error: {}", msg),
            BackupError::Timeout { waited } => write!(f, "no part arrived within {:?}", waited),
        }
    }
}

impl std::error::Error for BackupError {}

impl From<io::Error> for BackupError {
    fn from(e: io::Error) -> Self {
        BackupError::Io(e)
    }
}

impl From<FrameError> for BackupError {
    fn from(e: FrameError) -> Self {
        BackupError::Frame(e)
    }
}

impl From<CryptoError> for BackupError {
    fn from(e: CryptoError) -> Self {
        BackupError::Crypto(e)
    }
}

impl From<CompressionError> for BackupError {
    fn from(e: CompressionError) -> Self {
        BackupError::Compression(e)
    }
}

impl From<CodecError> for BackupError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Crypto(e) => BackupError::Crypto(e),
            CodecError::Compression(e) => BackupError::Compression(e),
        }
    }
}

impl From<PartNameError> for BackupError {
    fn from(e: PartNameError) -> Self {
        BackupError::PartName(e)
    }
}

impl From<SnapshotError> for BackupError {
    fn from(e: SnapshotError) -> Self {
        BackupError::Snapshot(e)
    }
}

impl From<ProcessError> for BackupError {
    fn from(e: ProcessError) -> Self {
        BackupError::Process(e)
    }
}

impl From<RemoteError> for BackupError {
    fn from(e: RemoteError) -> Self {
        BackupError::Remote(e)
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(e: serde_json::Error) -> Self {
        BackupError::Config(e.to_string())
    }
}
