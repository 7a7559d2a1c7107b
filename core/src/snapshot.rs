//! snapshot.rs
//! Datasets, snapshots, and the ordered snapshot list of one dataset.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Not of the form `dataset@name`.
    InvalidName(String),
    BaseSnapshotNotFound { dataset: String },
    SnapshotNotFound { dataset: String, name: String },
    DuplicateSnapshot { dataset: String, name: String },
    /// A snapshot of another dataset was handed to this dataset's list.
    ForeignSnapshot { dataset: String, snapshot: String },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SnapshotError::*;
        match self {
            InvalidName(s) =>
                write!(f, "invalid snapshot name: {:?}", s),
            BaseSnapshotNotFound { dataset } =>
                write!(f, "no base snapshot for dataset {}", dataset),
            SnapshotNotFound { dataset, name } =>
                write!(f, "snapshot {}@{} not found", dataset, name),
            DuplicateSnapshot { dataset, name } =>
                write!(f, "duplicate snapshot {}@{}", dataset, name),
            ForeignSnapshot { dataset, snapshot } =>
                write!(f, "snapshot {} does not belong to dataset {}", snapshot, dataset),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Immutable `dataset@name`. Equality is by full name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot {
    full: String,
    at: usize,
}

impl Snapshot {
    pub fn new(dataset: &str, name: &str) -> Result<Self, SnapshotError> {
        Self::parse(&format!("{}@{}", dataset, name))
    }

    pub fn parse(full: &str) -> Result<Self, SnapshotError> {
        let at = match full.find('@') {
            Some(i) if full[i + 1..].find('@').is_none() => i,
            _ => return Err(SnapshotError::InvalidName(full.to_string())),
        };
        if at == 0 || at + 1 == full.len() {
            return Err(SnapshotError::InvalidName(full.to_string()));
        }
        Ok(Self { full: full.to_string(), at })
    }

    pub fn full_name(&self) -> &str {
        &self.full
    }

    pub fn name(&self) -> &str {
        &self.full[self.at + 1..]
    }

    pub fn dataset(&self) -> &str {
        &self.full[..self.at]
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for Snapshot {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Snapshot::parse(s)
    }
}

/// Parent of a dataset (`pool/a/b` -> `pool/a`), `None` for a pool root.
pub fn parent_dataset(dataset: &str) -> Option<&str> {
    dataset.rfind('/').map(|i| &dataset[..i])
}

/// One dataset and its snapshots in creation order. Element 0 is the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemSnapshots {
    dataset: String,
    snapshots: Vec<Snapshot>,
}

impl FilesystemSnapshots {
    pub fn new(dataset: &str, snapshots: Vec<Snapshot>) -> Result<Self, SnapshotError> {
        for (i, s) in snapshots.iter().enumerate() {
            if s.dataset() != dataset {
                return Err(SnapshotError::ForeignSnapshot {
                    dataset: dataset.to_string(),
                    snapshot: s.full_name().to_string(),
                });
            }
            if snapshots[..i].iter().any(|p| p.name() == s.name()) {
                return Err(SnapshotError::DuplicateSnapshot {
                    dataset: dataset.to_string(),
                    name: s.name().to_string(),
                });
            }
        }
        Ok(Self { dataset: dataset.to_string(), snapshots })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.snapshots.iter().position(|s| s.name() == name)
    }

    fn not_found(&self, name: &str) -> SnapshotError {
        SnapshotError::SnapshotNotFound { dataset: self.dataset.clone(), name: name.to_string() }
    }

    pub fn base_snapshot(&self) -> Result<&Snapshot, SnapshotError> {
        self.snapshots.first().ok_or_else(|| SnapshotError::BaseSnapshotNotFound {
            dataset: self.dataset.clone(),
        })
    }

    /// Snapshots after the base up to and including `upper`.
    pub fn incremental_snapshots(&self, upper: &str) -> Result<&[Snapshot], SnapshotError> {
        self.base_snapshot()?;
        match self.position(upper) {
            Some(hi) if hi >= 1 => Ok(&self.snapshots[1..=hi]),
            _ => Err(self.not_found(upper)),
        }
    }

    /// Snapshots after the base from `lower` through `upper`, both inclusive.
    pub fn incremental_snapshots_between(&self, lower: &str, upper: &str) -> Result<&[Snapshot], SnapshotError> {
        self.base_snapshot()?;
        let lo = match self.position(lower) {
            Some(i) if i >= 1 => i,
            _ => return Err(self.not_found(lower)),
        };
        match self.position(upper) {
            Some(hi) if hi >= lo => Ok(&self.snapshots[lo..=hi]),
            _ => Err(self.not_found(upper)),
        }
    }

    /// Base followed by every snapshot up to and including `upper`.
    pub fn snapshots_up_to(&self, upper: &str) -> Result<&[Snapshot], SnapshotError> {
        self.base_snapshot()?;
        match self.position(upper) {
            Some(hi) => Ok(&self.snapshots[..=hi]),
            None => Err(self.not_found(upper)),
        }
    }

    /// `lower` through `upper` inclusive, where `lower` may be the base.
    pub fn snapshots_between(&self, lower: &str, upper: &str) -> Result<&[Snapshot], SnapshotError> {
        self.base_snapshot()?;
        let lo = self.position(lower).ok_or_else(|| self.not_found(lower))?;
        match self.position(upper) {
            Some(hi) if hi >= lo => Ok(&self.snapshots[lo..=hi]),
            _ => Err(self.not_found(upper)),
        }
    }
}
