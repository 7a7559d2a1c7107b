//! sender/strategy.rs
//! Which transfers a snapshot chain turns into.
//!
//! | chain `[s0, s1, s2]` | from full                  | from incremental |
//! |----------------------|----------------------------|------------------|
//! | `PerSnapshot`        | full s0, s0->s1, s1->s2    | s0->s1, s1->s2   |
//! | `PerDataset`         | full s0, s0=>s2 (multi)    | s0=>s2 (multi)   |

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::parts::StreamName;
use crate::snapshot::Snapshot;
use crate::types::BackupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOp {
    Full { snapshot: Snapshot },
    Incremental { base: Snapshot, target: Snapshot },
    /// One stream carrying every snapshot from `base` through `target`.
    MultiIncremental { base: Snapshot, target: Snapshot },
}

impl SendOp {
    /// Transfer label carried in the stream name.
    pub fn label(&self) -> String {
        match self {
            SendOp::Full { snapshot } => snapshot.full_name().to_string(),
            SendOp::Incremental { base, target } | SendOp::MultiIncremental { base, target } =>
                format!("{}@{}->{}", target.dataset(), base.name(), target.name()),
        }
    }

    pub fn stream_name(&self, stamp: DateTime<Utc>) -> StreamName {
        match self {
            SendOp::Full { snapshot } => StreamName::for_full(stamp, snapshot),
            SendOp::Incremental { base, target } | SendOp::MultiIncremental { base, target } =>
                StreamName::for_incremental(stamp, base, target),
        }
    }

    pub fn target(&self) -> &Snapshot {
        match self {
            SendOp::Full { snapshot } => snapshot,
            SendOp::Incremental { target, .. } | SendOp::MultiIncremental { target, .. } => target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStrategy {
    /// One incremental per consecutive snapshot pair.
    PerSnapshot,
    /// One multi-incremental spanning base to latest.
    PerDataset,
}

impl SendStrategy {
    pub fn from_config(cfg: &Config) -> Self {
        if cfg.multi_incremental {
            SendStrategy::PerDataset
        } else {
            SendStrategy::PerSnapshot
        }
    }

    /// Incremental op for one `base -> target` link under this strategy.
    pub fn incremental(self, base: &Snapshot, target: &Snapshot) -> SendOp {
        match self {
            SendStrategy::PerSnapshot => SendOp::Incremental { base: base.clone(), target: target.clone() },
            SendStrategy::PerDataset => SendOp::MultiIncremental { base: base.clone(), target: target.clone() },
        }
    }

    pub fn plan_starting_from_full(self, snapshots: &[Snapshot]) -> Result<Vec<SendOp>, BackupError> {
        check_chain(snapshots, 1)?;
        let base = &snapshots[0];
        let mut ops = vec![SendOp::Full { snapshot: base.clone() }];
        ops.extend(self.plan_links(snapshots));
        Ok(ops)
    }

    /// The first snapshot is already on the target and only serves as the base.
    pub fn plan_starting_from_incremental(self, snapshots: &[Snapshot]) -> Result<Vec<SendOp>, BackupError> {
        check_chain(snapshots, 2)?;
        Ok(self.plan_links(snapshots))
    }

    fn plan_links(self, snapshots: &[Snapshot]) -> Vec<SendOp> {
        match self {
            SendStrategy::PerSnapshot => snapshots
                .windows(2)
                .map(|w| self.incremental(&w[0], &w[1]))
                .collect(),
            SendStrategy::PerDataset => match (snapshots.first(), snapshots.last()) {
                (Some(base), Some(last)) if snapshots.len() > 1 => vec![self.incremental(base, last)],
                _ => Vec::new(),
            },
        }
    }
}

fn check_chain(snapshots: &[Snapshot], min: usize) -> Result<(), BackupError> {
    if snapshots.len() < min {
        return Err(BackupError::InvalidArgument(format!(
            "need at least {} snapshot(s), got {}", min, snapshots.len()
        )));
    }
    let dataset = snapshots[0].dataset();
    if let Some(other) = snapshots.iter().find(|s| s.dataset() != dataset) {
        return Err(BackupError::InvalidArgument(format!(
            "snapshot {} is not in dataset {}", other, dataset
        )));
    }
    Ok(())
}
