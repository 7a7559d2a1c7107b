//! backup.rs
//! Backs up a whole dataset tree through the snapshot sender.
//!
//! Summary: lists the datasets under the root, resolves each one's snapshot
//! chain, and hands the chain to the sender. Datasets are processed in tree
//! order (parent first) so a restore never receives a child before its parent.

use std::sync::Arc;

use crate::config::Config;
use crate::context::Context;
use crate::sender::{SendOp, SendReport, SnapshotSender};
use crate::snapshot::{FilesystemSnapshots, Snapshot};
use crate::types::BackupError;
use crate::zfs::FilesystemLister;

/// Result of one backup run across the tree.
#[derive(Debug, Clone, Default)]
pub struct BackupReport {
    pub datasets: Vec<String>,
    pub transfers: Vec<SendReport>,
}

impl BackupReport {
    pub fn parts(&self) -> usize {
        self.transfers.iter().map(|t| t.parts.len()).sum()
    }

    pub fn plaintext_bytes(&self) -> u64 {
        self.transfers.iter().map(|t| t.plaintext_bytes).sum()
    }
}

pub struct BackupDriver {
    sender: SnapshotSender,
    lister: Arc<dyn FilesystemLister>,
    root_dataset: String,
    load_remote: bool,
    create_finished_marker: bool,
    ctx: Context,
}

impl BackupDriver {
    pub fn new(
        cfg: &Config,
        sender: SnapshotSender,
        lister: Arc<dyn FilesystemLister>,
        ctx: Context,
    ) -> Result<Self, BackupError> {
        if cfg.root_dataset.is_empty() {
            return Err(BackupError::Config("root_dataset must be set to back up".into()));
        }
        Ok(Self {
            sender,
            lister,
            root_dataset: cfg.root_dataset.clone(),
            load_remote: cfg.load_remote,
            create_finished_marker: cfg.create_finished_marker,
            ctx: ctx.child("backup"),
        })
    }

    pub fn sender(&self) -> &SnapshotSender {
        &self.sender
    }

    pub fn into_sender(self) -> SnapshotSender {
        self.sender
    }

    /// Full chain (base through `target`) of every dataset in the tree.
    pub fn backup_full(&mut self, target: &str) -> Result<BackupReport, BackupError> {
        let chains = self.resolve_chains(|fs| Ok(fs.snapshots_up_to(target)?.to_vec()))?;
        tracing::info!(parent: self.ctx.span(), target, datasets = chains.len(), "full backup started");

        let mut report = BackupReport::default();
        let mut ops = Vec::new();
        for (dataset, chain) in &chains {
            ops.extend(self.sender.plan_starting_from_full(chain)?);
            report.transfers.extend(self.sender.send_starting_from_full(chain)?);
            report.datasets.push(dataset.clone());
        }
        self.finish(&ops, report)
    }

    /// `lower` (already delivered) through `upper` of every dataset in the tree.
    pub fn backup_incremental(&mut self, lower: &str, upper: &str) -> Result<BackupReport, BackupError> {
        let chains = self.resolve_chains(|fs| Ok(fs.snapshots_between(lower, upper)?.to_vec()))?;
        tracing::info!(parent: self.ctx.span(), lower, upper, datasets = chains.len(), "incremental backup started");

        let mut report = BackupReport::default();
        let mut ops = Vec::new();
        for (dataset, chain) in &chains {
            ops.extend(self.sender.plan_starting_from_incremental(chain)?);
            report.transfers.extend(self.sender.send_starting_from_incremental(chain)?);
            report.datasets.push(dataset.clone());
        }
        self.finish(&ops, report)
    }

    /// Every dataset's chain is resolved before anything is sent, so a dataset
    /// missing the requested snapshot fails the run up front.
    fn resolve_chains<F>(&self, select: F) -> Result<Vec<(String, Vec<Snapshot>)>, BackupError>
    where
        F: Fn(&FilesystemSnapshots) -> Result<Vec<Snapshot>, BackupError>,
    {
        let trees = self.resolve_tree()?;
        let mut chains = Vec::with_capacity(trees.len());
        for fs in &trees {
            chains.push((fs.dataset().to_string(), select(fs)?));
        }
        Ok(chains)
    }

    fn resolve_tree(&self) -> Result<Vec<FilesystemSnapshots>, BackupError> {
        let datasets = self.lister.list_filesystems(&self.root_dataset)?;
        if datasets.is_empty() {
            return Err(BackupError::InvalidArgument(format!(
                "no datasets under {}", self.root_dataset
            )));
        }
        let mut trees = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let snapshots = self.lister.list_snapshots(&dataset)?;
            trees.push(FilesystemSnapshots::new(&dataset, snapshots)?);
        }
        Ok(trees)
    }

    fn finish(&self, ops: &[SendOp], report: BackupReport) -> Result<BackupReport, BackupError> {
        if self.load_remote {
            self.sender.check_sent_ops(ops)?;
        }
        if self.create_finished_marker {
            self.sender.queue().create_finished_marker()?;
        }
        tracing::info!(
            parent: self.ctx.span(),
            datasets = report.datasets.len(),
            transfers = report.transfers.len(),
            parts = report.parts(),
            "backup finished"
        );
        Ok(report)
    }
}
