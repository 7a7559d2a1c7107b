//! zfs/commands.rs
//! `zfs` CLI invocations behind `ProcessFactory` and `FilesystemLister`.

use std::process::Command;

use crate::context::Context;
use crate::snapshot::Snapshot;
use crate::zfs::process::{ProcessReceiveStream, ProcessSendStream};
use crate::zfs::types::{FilesystemLister, ProcessError, ProcessFactory, ReceiveStream, SendStream};

pub struct ZfsCommands {
    program: String,
    ctx: Context,
}

impl ZfsCommands {
    pub fn new(ctx: Context) -> Self {
        Self::with_program("zfs", ctx)
    }

    /// Use another binary (wrappers, sudo shims).
    pub fn with_program(program: &str, ctx: Context) -> Self {
        Self { program: program.to_string(), ctx }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }

    fn spawn_send(&self, args: &[&str]) -> Result<Box<dyn SendStream>, ProcessError> {
        let stream = ProcessSendStream::spawn(self.command(args), &self.program, self.ctx.span())?;
        Ok(Box::new(stream))
    }

    fn output_lines(&self, args: &[&str]) -> Result<Vec<String>, ProcessError> {
        let output = self
            .command(args)
            .output()
            .map_err(|source| ProcessError::Spawn { program: self.program.clone(), source })?;
        if !output.status.success() {
            tracing::error!(
                parent: self.ctx.span(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "list failed"
            );
            return Err(ProcessError::ExitStatus { program: self.program.clone(), code: output.status.code() });
        }
        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| ProcessError::Output("listing is not UTF-8".into()))?;
        Ok(stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
    }
}

impl ProcessFactory for ZfsCommands {
    fn send_full(&self, snapshot: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError> {
        self.spawn_send(&["send", "-vpP", snapshot.full_name()])
    }

    fn send_incremental(&self, base: &Snapshot, target: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError> {
        self.spawn_send(&["send", "-vpPi", base.full_name(), target.full_name()])
    }

    fn send_multi_incremental(&self, base: &Snapshot, target: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError> {
        self.spawn_send(&["send", "-vpPI", base.full_name(), target.full_name()])
    }

    fn receive(&self, pool: &str) -> Result<Box<dyn ReceiveStream>, ProcessError> {
        let stream = ProcessReceiveStream::spawn(self.command(&["receive", "-duv", pool]), &self.program, self.ctx.span())?;
        Ok(Box::new(stream))
    }
}

impl FilesystemLister for ZfsCommands {
    fn list_filesystems(&self, parent: &str) -> Result<Vec<String>, ProcessError> {
        self.output_lines(&["list", "-rH", "-o", "name", "-t", "filesystem,volume", parent])
    }

    fn list_snapshots(&self, dataset: &str) -> Result<Vec<Snapshot>, ProcessError> {
        self.output_lines(&["list", "-H", "-o", "name", "-s", "creation", "-t", "snapshot", "-d", "1", dataset])?
            .iter()
            .map(|line| Snapshot::parse(line).map_err(|e| ProcessError::Output(e.to_string())))
            .collect()
    }
}
