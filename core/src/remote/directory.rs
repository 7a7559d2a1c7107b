//! remote/directory.rs
//! `RemoteStore` that mirrors parts into a local directory (NFS mounts, tests).
//!
//! Objects land via a temp file in the same directory: write, fsync, rename.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::crypto::{digest_file, FileDigest};
use crate::remote::types::{RemoteCheck, RemoteError, RemoteStore};

const TEMP_PREFIX: &str = ".upload-";

pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, RemoteError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, RemoteError> {
        if key.is_empty() || key.starts_with('.') || key.contains('/') || key.contains('\\') {
            return Err(RemoteError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

impl RemoteStore for DirectoryStore {
    fn upload(&self, path: &Path, key: &str) -> Result<(), RemoteError> {
        let target = self.object_path(key)?;

        let mut tmp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(&self.root)?;
        let mut src = File::open(path)?;
        io::copy(&mut src, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;
        persist(tmp, &target)
    }

    fn verify(&self, key: &str, expected: &FileDigest) -> Result<RemoteCheck, RemoteError> {
        let target = self.object_path(key)?;
        if !target.is_file() {
            return Ok(RemoteCheck::Missing);
        }
        let actual = digest_file(&target, expected.alg)?;
        if &actual == expected {
            Ok(RemoteCheck::Present)
        } else {
            Ok(RemoteCheck::Mismatch { actual })
        }
    }

    fn list_keys(&self) -> Result<Vec<String>, RemoteError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn persist(tmp: NamedTempFile, target: &Path) -> Result<(), RemoteError> {
    tmp.persist(target).map_err(|e| RemoteError::Io(e.error))?;
    Ok(())
}
