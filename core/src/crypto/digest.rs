//! crypto/digest.rs
//! Whole-file digests for published parts.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Supported digest algorithms.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlg {
    Sha256 = 0x0001,
    Blake3 = 0x0003,
}

impl Default for DigestAlg {
    fn default() -> Self {
        DigestAlg::Sha256
    }
}

/// Internal hashing state.
pub enum DigestState {
    Sha256(Sha256),
    Blake3(blake3::Hasher),
}

impl DigestState {
    pub fn new(alg: DigestAlg) -> Self {
        match alg {
            DigestAlg::Sha256 => DigestState::Sha256(Sha256::new()),
            DigestAlg::Blake3 => DigestState::Blake3(blake3::Hasher::new()),
        }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        match self {
            DigestState::Sha256(h) => h.update(data),
            DigestState::Blake3(h) => { h.update(data); },
        }
    }

    #[inline]
    pub fn finalize(self) -> Vec<u8> {
        match self {
            DigestState::Sha256(h) => h.finalize().to_vec(),
            DigestState::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// Digest value as lowercase hex, the form stored next to remote objects.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest {
    pub alg: DigestAlg,
    pub hex: String,
}

impl FileDigest {
    pub fn from_bytes(alg: DigestAlg, bytes: &[u8]) -> Self {
        Self { alg, hex: hex::encode(bytes) }
    }
}

impl std::fmt::Display for FileDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}:{}", self.alg, self.hex)
    }
}

const DIGEST_BUF_LEN: usize = 64 * 1024;

/// Stream `path` through `alg`.
pub fn digest_file(path: &Path, alg: DigestAlg) -> io::Result<FileDigest> {
    let mut file = File::open(path)?;
    digest_reader(&mut file, alg)
}

pub fn digest_reader<R: Read + ?Sized>(r: &mut R, alg: DigestAlg) -> io::Result<FileDigest> {
    let mut state = DigestState::new(alg);
    let mut buf = vec![0u8; DIGEST_BUF_LEN];
    loop {
        match r.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => state.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(FileDigest::from_bytes(alg, &state.finalize()))
}
