use std::fmt;
use std::io::{self, Read, Write};

use crate::snapshot::Snapshot;

#[derive(Debug)]
pub enum ProcessError {
    Spawn { program: String, source: io::Error },
    Io(io::Error),
    /// The process exited unsuccessfully. `code` is `None` when killed by a signal.
    ExitStatus { program: String, code: Option<i32> },
    /// Output that could not be interpreted.
    Output(String),
    /// The stderr drain thread panicked.
    Join { program: String },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ProcessError::*;
        match self {
            Spawn { program, source } => write!(f, "failed to spawn {}: {}", program, source),
            Io(e) => write!(f, "process I/O error: {}", e),
            ExitStatus { program, code: Some(c) } => write!(f, "{} exited with status {}", program, c),
            ExitStatus { program, code: None } => write!(f, "{} terminated by signal", program),
            Output(msg) => write!(f, "unexpected process output: {}", msg),
            Join { program } => write!(f, "stderr drain of {} panicked", program),
        }
    }
}

impl std::error::Error for ProcessError {}

impl From<io::Error> for ProcessError {
    fn from(e: io::Error) -> Self {
        ProcessError::Io(e)
    }
}

/// Stdout of a running send process.
pub trait SendStream: Read + Send {
    /// Wait for exit; non-zero status is an error.
    fn close(self: Box<Self>) -> Result<(), ProcessError>;
    /// Terminate, wait, and join the stderr drain.
    fn kill(self: Box<Self>) -> Result<(), ProcessError>;
}

/// Stdin of a running receive process.
pub trait ReceiveStream: Write + Send {
    /// Close stdin and wait for exit; non-zero status is an error.
    fn close(self: Box<Self>) -> Result<(), ProcessError>;
    fn kill(self: Box<Self>) -> Result<(), ProcessError>;
}

pub trait ProcessFactory: Send + Sync {
    fn send_full(&self, snapshot: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError>;
    fn send_incremental(&self, base: &Snapshot, target: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError>;
    /// One stream carrying every snapshot between `base` and `target`.
    fn send_multi_incremental(&self, base: &Snapshot, target: &Snapshot) -> Result<Box<dyn SendStream>, ProcessError>;
    fn receive(&self, pool: &str) -> Result<Box<dyn ReceiveStream>, ProcessError>;
}

pub trait FilesystemLister: Send + Sync {
    /// `parent` and every dataset below it, parents first.
    fn list_filesystems(&self, parent: &str) -> Result<Vec<String>, ProcessError>;
    /// Snapshots of exactly `dataset`, oldest first.
    fn list_snapshots(&self, dataset: &str) -> Result<Vec<Snapshot>, ProcessError>;
}
