//! parts/queue.rs
//! Directory-backed part queue shared by sender and receiver.
//!
//! The directory is the only channel between the two sides:
//! - the sender stages `<part>.partial`, then publishes it by rename;
//! - the receiver always takes the smallest part name, then deletes it or
//!   renames it to `<part>.received`;
//! - the `finished` sentinel ends the receiver once no parts remain.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::constants::names::{FINISHED_MARKER, READY_SUFFIX, RECEIVED_SUFFIX, STAGING_SUFFIX};
use crate::context::Context;
use crate::parts::naming::PartName;
use crate::types::BackupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartPoll {
    Ready(PathBuf),
    /// Nothing to read yet; poll again later.
    NoMoreParts,
    /// Only the sentinel remains.
    Finished,
}

pub struct FilePartDirectory {
    dir: PathBuf,
    ctx: Context,
}

impl FilePartDirectory {
    pub fn new(dir: impl Into<PathBuf>, ctx: Context) -> Result<Self, BackupError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ctx })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Smallest published part, or why there is none.
    pub fn next_input_path(&self) -> Result<PartPoll, BackupError> {
        let mut parts: BTreeMap<PartName, Vec<PathBuf>> = BTreeMap::new();
        let mut finished = false;

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };

            if name == FINISHED_MARKER {
                finished = true;
                continue;
            }
            if name.starts_with('.') || name.ends_with(STAGING_SUFFIX) || name.ends_with(RECEIVED_SUFFIX) {
                continue;
            }

            let bare = name.strip_suffix(READY_SUFFIX).unwrap_or(name);
            match PartName::parse(bare) {
                Ok(part) => parts.entry(part).or_default().push(entry.path()),
                Err(e) => {
                    tracing::debug!(parent: self.ctx.span(), file = name, error = %e, "ignoring foreign file");
                }
            }
        }

        if let Some((part, paths)) = parts.iter().find(|(_, paths)| paths.len() > 1) {
            let mut paths = paths.clone();
            paths.sort();
            return Err(BackupError::TooManyParts { part: part.to_string(), paths });
        }

        match parts.into_iter().next() {
            Some((_, mut paths)) => match paths.pop() {
                Some(path) => Ok(PartPoll::Ready(path)),
                None => Ok(PartPoll::NoMoreParts),
            },
            None if finished => Ok(PartPoll::Finished),
            None => Ok(PartPoll::NoMoreParts),
        }
    }

    pub fn mark_received(&self, path: &Path) -> Result<PathBuf, BackupError> {
        let mut target = path.as_os_str().to_owned();
        target.push(RECEIVED_SUFFIX);
        let target = PathBuf::from(target);
        fs::rename(path, &target)?;
        Ok(target)
    }

    pub fn delete(&self, path: &Path) -> Result<(), BackupError> {
        fs::remove_file(path)?;
        Ok(())
    }

    pub fn staging_path(&self, part: &PartName) -> PathBuf {
        self.dir.join(format!("{}{}", part.file_name(), STAGING_SUFFIX))
    }

    pub fn published_path(&self, part: &PartName) -> PathBuf {
        self.dir.join(part.file_name())
    }

    /// Atomically expose a closed, synced staging file under its part name.
    pub fn publish(&self, staging: &Path, part: &PartName) -> Result<PathBuf, BackupError> {
        let target = self.published_path(part);
        if target.exists() {
            return Err(BackupError::TooManyParts {
                part: part.to_string(),
                paths: vec![staging.to_path_buf(), target],
            });
        }
        fs::rename(staging, &target)?;
        Ok(target)
    }

    /// Remove a staging file that will not be published.
    pub fn discard(&self, staging: &Path) -> Result<(), BackupError> {
        match fs::remove_file(staging) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_finished_marker(&self) -> Result<(), BackupError> {
        let path = self.dir.join(FINISHED_MARKER);
        let file: File = OpenOptions::new().write(true).create(true).truncate(true).open(&path)?;
        file.sync_all()?;
        tracing::info!(parent: self.ctx.span(), path = %path.display(), "finished marker created");
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.dir.join(FINISHED_MARKER).is_file()
    }
}
