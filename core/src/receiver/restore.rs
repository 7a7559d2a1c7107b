//! receiver/restore.rs
//! Restore loop as an explicit state machine.
//!
//! ```text
//! AwaitingPart --Ready--> (RotatingStream) --> ReadingPart --> AwaitingPart
//! AwaitingPart --NoMoreParts--> wait(poll_interval) --> AwaitingPart
//! AwaitingPart --Finished--> Terminated
//! ```
//!
//! The downstream receive process is closed (exit status checked) on rotation
//! and on normal exit, and killed when the loop fails.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::context::Context;
use crate::parts::{part_name_of, FilePartDirectory, FilePartReader, PartName, PartPoll};
use crate::receiver::cancel::{CancelToken, Wake};
use crate::receiver::continuity::{Continuity, ContinuityTracker};
use crate::types::BackupError;
use crate::zfs::{ProcessFactory, ReceiveStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreState {
    AwaitingPart,
    RotatingStream { path: PathBuf, part: PartName },
    ReadingPart { path: PathBuf, part: PartName },
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The sentinel was found with no parts left.
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub outcome: RestoreOutcome,
    pub parts_consumed: u64,
    pub streams_opened: u64,
    pub bytes_written: u64,
    pub empty_polls: u64,
}

impl RestoreReport {
    fn new() -> Self {
        Self {
            outcome: RestoreOutcome::Finished,
            parts_consumed: 0,
            streams_opened: 0,
            bytes_written: 0,
            empty_polls: 0,
        }
    }
}

pub struct RestoreDriver {
    queue: Arc<FilePartDirectory>,
    reader: FilePartReader,
    processes: Arc<dyn ProcessFactory>,
    pool: String,
    delete_after_receive: bool,
    poll_interval: Duration,
    idle_timeout: Option<Duration>,
    tracker: ContinuityTracker,
    downstream: Option<Box<dyn ReceiveStream>>,
    ctx: Context,
}

impl RestoreDriver {
    pub fn new(
        cfg: &Config,
        queue: Arc<FilePartDirectory>,
        processes: Arc<dyn ProcessFactory>,
        ctx: Context,
    ) -> Result<Self, BackupError> {
        cfg.validate()?;
        if cfg.target_pool.is_empty() {
            return Err(BackupError::Config("target_pool must be set to restore".into()));
        }
        let ctx = ctx.child("restore");
        Ok(Self {
            queue,
            reader: FilePartReader::from_config(cfg, ctx.clone())?,
            processes,
            pool: cfg.target_pool.clone(),
            delete_after_receive: cfg.delete_after_receive,
            poll_interval: cfg.poll_interval,
            idle_timeout: cfg.idle_timeout,
            tracker: ContinuityTracker::new(),
            downstream: None,
            ctx,
        })
    }

    pub fn run(&mut self, cancel: &CancelToken) -> Result<RestoreReport, BackupError> {
        let mut report = RestoreReport::new();
        tracing::info!(parent: self.ctx.span(), pool = %self.pool, "restore started");

        match self.run_loop(cancel, &mut report) {
            Ok(outcome) => {
                self.close_downstream()?;
                report.outcome = outcome;
                tracing::info!(
                    parent: self.ctx.span(),
                    ?outcome,
                    parts = report.parts_consumed,
                    streams = report.streams_opened,
                    bytes = report.bytes_written,
                    "restore finished"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(parent: self.ctx.span(), error = %e, "restore failed");
                self.kill_downstream();
                Err(e)
            }
        }
    }

    fn run_loop(&mut self, cancel: &CancelToken, report: &mut RestoreReport) -> Result<RestoreOutcome, BackupError> {
        let mut state = RestoreState::AwaitingPart;
        let mut idle = Duration::ZERO;

        loop {
            tracing::trace!(parent: self.ctx.span(), ?state, "restore state");
            state = match state {
                RestoreState::AwaitingPart => {
                    if cancel.is_cancelled() {
                        return Ok(RestoreOutcome::Cancelled);
                    }
                    match self.queue.next_input_path()? {
                        PartPoll::Ready(path) => {
                            idle = Duration::ZERO;
                            let part = part_name_of(&path)?;
                            let continuity = self.tracker.observe(&part);
                            if continuity.needs_new_downstream() || self.downstream.is_none() {
                                if continuity == Continuity::Rotate {
                                    tracing::info!(parent: self.ctx.span(), part = %part, "stream boundary");
                                }
                                RestoreState::RotatingStream { path, part }
                            } else {
                                RestoreState::ReadingPart { path, part }
                            }
                        }
                        PartPoll::Finished => RestoreState::Terminated,
                        PartPoll::NoMoreParts => {
                            report.empty_polls += 1;
                            self.ctx.update_counters(|c| c.polls_empty += 1);

                            let wait = match self.idle_timeout {
                                Some(limit) if idle >= limit => {
                                    return Err(BackupError::Timeout { waited: idle });
                                }
                                Some(limit) => self.poll_interval.min(limit - idle),
                                None => self.poll_interval,
                            };
                            tracing::debug!(parent: self.ctx.span(), ?wait, "no parts yet");
                            match cancel.wait(wait) {
                                Wake::Cancelled => return Ok(RestoreOutcome::Cancelled),
                                Wake::Elapsed => {
                                    idle += wait;
                                    RestoreState::AwaitingPart
                                }
                            }
                        }
                    }
                }
                RestoreState::RotatingStream { path, part } => {
                    self.close_downstream()?;
                    self.downstream = Some(self.processes.receive(&self.pool)?);
                    report.streams_opened += 1;
                    RestoreState::ReadingPart { path, part }
                }
                RestoreState::ReadingPart { path, part } => {
                    let sink = self
                        .downstream
                        .as_mut()
                        .ok_or_else(|| BackupError::InvalidArgument("no receive stream open".into()))?;
                    let summary = self.reader.read(&path, sink.as_mut())?;

                    if self.delete_after_receive {
                        self.queue.delete(&path)?;
                    } else {
                        self.queue.mark_received(&path)?;
                    }
                    tracing::info!(parent: self.ctx.span(), part = %part, bytes = summary.plaintext_bytes, "part received");

                    self.tracker.commit(part);
                    report.parts_consumed += 1;
                    report.bytes_written += summary.plaintext_bytes;
                    RestoreState::AwaitingPart
                }
                RestoreState::Terminated => return Ok(RestoreOutcome::Finished),
            };
        }
    }

    fn close_downstream(&mut self) -> Result<(), BackupError> {
        if let Some(downstream) = self.downstream.take() {
            downstream.close()?;
            self.ctx.update_counters(|c| c.streams_received += 1);
        }
        Ok(())
    }

    fn kill_downstream(&mut self) {
        if let Some(downstream) = self.downstream.take() {
            if let Err(e) = downstream.kill() {
                tracing::warn!(parent: self.ctx.span(), error = %e, "killing receive process failed");
            }
        }
    }
}
