//! sender/sender.rs
//! Drives send processes through the part writer into the queue.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, HashTiming};
use crate::constants::names::SENT_LEDGER;
use crate::context::Context;
use crate::crypto::{digest_file, DigestAlg, FileDigest};
use crate::parts::{FilePartDirectory, FilePartWriter, PartName, PartOutcome, StampClock, StreamName};
use crate::remote::{RemoteCheck, RemoteStore};
use crate::sender::ledger::{SentLedger, SentPart};
use crate::sender::strategy::{SendOp, SendStrategy};
use crate::snapshot::Snapshot;
use crate::telemetry::Stage;
use crate::types::BackupError;
use crate::zfs::{ProcessFactory, SendStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub op: SendOp,
    pub stream: StreamName,
    pub parts: Vec<PartName>,
    pub plaintext_bytes: u64,
}

/// Fail with `IncorrectHash` unless `path` still hashes to `expected`.
pub fn verify_file_digest(path: &Path, expected: &FileDigest) -> Result<(), BackupError> {
    let actual = digest_file(path, expected.alg)?;
    if &actual != expected {
        return Err(BackupError::IncorrectHash {
            path: path.to_path_buf(),
            expected: expected.hex.clone(),
            actual: actual.hex,
        });
    }
    Ok(())
}

pub struct SnapshotSender {
    strategy: SendStrategy,
    writer: FilePartWriter,
    queue: Arc<FilePartDirectory>,
    processes: Arc<dyn ProcessFactory>,
    remote: Option<Arc<dyn RemoteStore>>,
    load_remote: bool,
    digest: DigestAlg,
    hash_timing: HashTiming,
    clock: StampClock,
    ledger: SentLedger,
    ctx: Context,
}

impl SnapshotSender {
    pub fn new(
        cfg: &Config,
        queue: Arc<FilePartDirectory>,
        processes: Arc<dyn ProcessFactory>,
        remote: Option<Arc<dyn RemoteStore>>,
        ctx: Context,
    ) -> Result<Self, BackupError> {
        cfg.validate()?;
        if cfg.load_remote && remote.is_none() {
            return Err(BackupError::Config("load_remote is set but no remote store was given".into()));
        }
        let ctx = ctx.child("sender");
        let ledger = SentLedger::load(queue.path().join(SENT_LEDGER))?;
        Ok(Self {
            strategy: SendStrategy::from_config(cfg),
            writer: FilePartWriter::from_config(cfg, ctx.clone())?,
            queue,
            processes,
            remote,
            load_remote: cfg.load_remote,
            digest: cfg.digest,
            hash_timing: cfg.hash_timing,
            clock: StampClock::new(),
            ledger,
            ctx,
        })
    }

    pub fn strategy(&self) -> SendStrategy {
        self.strategy
    }

    pub fn queue(&self) -> &FilePartDirectory {
        &self.queue
    }

    /// Uploads recorded by this and earlier runs over the same queue.
    pub fn ledger(&self) -> &SentLedger {
        &self.ledger
    }

    pub fn send_base_snapshot(&mut self, snapshot: &Snapshot) -> Result<SendReport, BackupError> {
        self.run(SendOp::Full { snapshot: snapshot.clone() })
    }

    pub fn send_incremental_snapshot(&mut self, base: &Snapshot, target: &Snapshot) -> Result<SendReport, BackupError> {
        self.run(self.strategy.incremental(base, target))
    }

    pub fn plan_starting_from_full(&self, snapshots: &[Snapshot]) -> Result<Vec<SendOp>, BackupError> {
        self.strategy.plan_starting_from_full(snapshots)
    }

    pub fn plan_starting_from_incremental(&self, snapshots: &[Snapshot]) -> Result<Vec<SendOp>, BackupError> {
        self.strategy.plan_starting_from_incremental(snapshots)
    }

    pub fn send_starting_from_full(&mut self, snapshots: &[Snapshot]) -> Result<Vec<SendReport>, BackupError> {
        let ops = self.plan_starting_from_full(snapshots)?;
        self.run_all(ops)
    }

    pub fn send_starting_from_incremental(&mut self, snapshots: &[Snapshot]) -> Result<Vec<SendReport>, BackupError> {
        let ops = self.plan_starting_from_incremental(snapshots)?;
        self.run_all(ops)
    }

    /// Every transfer `send_starting_from_full(snapshots)` performs must have
    /// completed, in this run or an earlier one, and every one of its parts
    /// must still be in the remote store with the digest recorded at upload.
    pub fn check_sent(&self, snapshots: &[Snapshot]) -> Result<(), BackupError> {
        let ops = self.plan_starting_from_full(snapshots)?;
        self.check_sent_ops(&ops)
    }

    pub fn check_sent_ops(&self, ops: &[SendOp]) -> Result<(), BackupError> {
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| BackupError::InvalidArgument("check_sent needs a remote store".into()))?;

        for op in ops {
            let label = op.label();
            let transfer = match self.ledger.get(&label) {
                Some(t) if t.complete && !t.parts.is_empty() => t,
                _ => {
                    tracing::error!(parent: self.ctx.span(), transfer = %label, "transfer never completed an upload");
                    return Err(BackupError::S3MissesFile { key: label });
                }
            };
            for sent in &transfer.parts {
                match remote.verify(&sent.key, &sent.digest)? {
                    RemoteCheck::Present => {}
                    RemoteCheck::Missing | RemoteCheck::Mismatch { .. } => {
                        tracing::error!(parent: self.ctx.span(), key = %sent.key, "remote part missing or altered");
                        return Err(BackupError::S3MissesFile { key: sent.key.clone() });
                    }
                }
            }
            tracing::debug!(parent: self.ctx.span(), transfer = %label, parts = transfer.parts.len(), "remote transfer verified");
        }
        Ok(())
    }

    fn run_all(&mut self, ops: Vec<SendOp>) -> Result<Vec<SendReport>, BackupError> {
        let mut reports = Vec::with_capacity(ops.len());
        for op in ops {
            reports.push(self.run(op)?);
        }
        Ok(reports)
    }

    fn spawn(&self, op: &SendOp) -> Result<Box<dyn SendStream>, BackupError> {
        let stream = match op {
            SendOp::Full { snapshot } => self.processes.send_full(snapshot)?,
            SendOp::Incremental { base, target } => self.processes.send_incremental(base, target)?,
            SendOp::MultiIncremental { base, target } => self.processes.send_multi_incremental(base, target)?,
        };
        Ok(stream)
    }

    fn run(&mut self, op: SendOp) -> Result<SendReport, BackupError> {
        let stream = op.stream_name(self.clock.next());
        tracing::info!(parent: self.ctx.span(), transfer = %op.label(), stream = %stream, "transfer started");

        let label = op.label();
        if self.load_remote {
            self.ledger.begin(&label, &stream.encoded())?;
        }

        let mut source = self.spawn(&op)?;
        let drained = self.drain(&op, &stream, &mut *source);

        match drained {
            Ok(report) => {
                source.close()?;
                if self.load_remote {
                    self.ledger.complete(&label)?;
                }
                self.ctx.update_counters(|c| c.streams_sent += 1);
                tracing::info!(
                    parent: self.ctx.span(),
                    transfer = %op.label(),
                    parts = report.parts.len(),
                    plaintext = report.plaintext_bytes,
                    "transfer finished"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(parent: self.ctx.span(), transfer = %op.label(), error = %e, "transfer failed");
                if let Err(k) = source.kill() {
                    tracing::warn!(parent: self.ctx.span(), error = %k, "killing send process failed");
                }
                Err(e)
            }
        }
    }

    fn drain(&mut self, op: &SendOp, stream: &StreamName, source: &mut dyn SendStream) -> Result<SendReport, BackupError> {
        let mut report = SendReport {
            op: op.clone(),
            stream: stream.clone(),
            parts: Vec::new(),
            plaintext_bytes: 0,
        };
        let mut part = stream.part(0);

        loop {
            let staging = self.queue.staging_path(&part);
            let outcome = match self.writer.write(&mut *source, &staging) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.queue.discard(&staging)?;
                    return Err(e);
                }
            };
            let summary = *outcome.summary();

            // The previous part ended exactly at the size limit and nothing followed.
            if summary.records == 0 && part.part_number > 0 {
                self.queue.discard(&staging)?;
                break;
            }

            let closed_digest = match (self.load_remote, self.hash_timing) {
                (true, HashTiming::AtClose) => Some(self.digest_of(&staging)?),
                _ => None,
            };

            let published = self.queue.publish(&staging, &part)?;
            if self.load_remote {
                self.upload(&op.label(), &part, &published, closed_digest)?;
            }

            report.plaintext_bytes += summary.plaintext_bytes;
            report.parts.push(part.clone());

            match outcome {
                PartOutcome::SizeLimitReached(_) => {
                    part = part.next().ok_or_else(|| BackupError::TooManyParts {
                        part: part.to_string(),
                        paths: Vec::new(),
                    })?;
                }
                PartOutcome::StreamEnded(_) => break,
            }
        }
        Ok(report)
    }

    fn digest_of(&self, path: &Path) -> Result<FileDigest, BackupError> {
        let t = Instant::now();
        let digest = digest_file(path, self.digest)?;
        self.ctx.add_stage_time(Stage::Digest, t.elapsed());
        Ok(digest)
    }

    fn upload(
        &mut self,
        label: &str,
        part: &PartName,
        published: &Path,
        closed_digest: Option<FileDigest>,
    ) -> Result<(), BackupError> {
        let remote = match &self.remote {
            Some(r) => Arc::clone(r),
            None => return Ok(()),
        };

        let digest = match closed_digest {
            Some(expected) => {
                let t = Instant::now();
                verify_file_digest(published, &expected)?;
                self.ctx.add_stage_time(Stage::Digest, t.elapsed());
                expected
            }
            None => self.digest_of(published)?,
        };

        let key = part.file_name();
        let t = Instant::now();
        remote.upload(published, &key)?;
        self.ctx.add_stage_time(Stage::Upload, t.elapsed());

        match remote.verify(&key, &digest)? {
            RemoteCheck::Present => {}
            RemoteCheck::Missing => return Err(BackupError::S3MissesFile { key }),
            RemoteCheck::Mismatch { actual } => {
                return Err(BackupError::IncorrectHash {
                    path: published.to_path_buf(),
                    expected: digest.hex,
                    actual: actual.hex,
                });
            }
        }

        self.ctx.update_counters(|c| c.parts_uploaded += 1);
        tracing::info!(parent: self.ctx.span(), key = %key, digest = %digest, "part uploaded");

        self.ledger.record_part(label, SentPart { key, digest })?;
        Ok(())
    }
}
