//! zfs/process.rs
//! Child process wrapper with a dedicated stderr drain thread.
//!
//! The drain keeps the child from blocking on a full stderr pipe and logs each
//! line under the owner's span. `close` waits and checks the exit status,
//! `kill` terminates; both join the drain.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use tracing::Span;

use crate::zfs::types::{ProcessError, ReceiveStream, SendStream};

pub struct ProcessHandle {
    program: String,
    child: Child,
    drain: Option<JoinHandle<()>>,
    span: Span,
    done: bool,
}

impl ProcessHandle {
    pub fn spawn(mut cmd: Command, program: &str, span: &Span, stdin: Stdio, stdout: Stdio) -> Result<Self, ProcessError> {
        tracing::info!(parent: span, command = ?cmd, "spawning");
        let mut child = cmd
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn { program: program.to_string(), source })?;

        let drain = child.stderr.take().map(|stderr| {
            let span = span.clone();
            let program = program.to_string();
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines() {
                    match line {
                        Ok(line) => tracing::info!(parent: &span, process = %program, "{}", line),
                        Err(e) => {
                            tracing::warn!(parent: &span, process = %program, error = %e, "stderr drain stopped");
                            break;
                        }
                    }
                }
            })
        });

        Ok(Self { program: program.to_string(), child, drain, span: span.clone(), done: false })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn join_drain(&mut self) -> Result<(), ProcessError> {
        match self.drain.take() {
            Some(h) => h.join().map_err(|_| ProcessError::Join { program: self.program.clone() }),
            None => Ok(()),
        }
    }

    pub fn wait(&mut self) -> Result<(), ProcessError> {
        let status = self.child.wait()?;
        self.done = true;
        self.join_drain()?;
        tracing::info!(parent: &self.span, process = %self.program, %status, "exited");
        if !status.success() {
            return Err(ProcessError::ExitStatus { program: self.program.clone(), code: status.code() });
        }
        Ok(())
    }

    pub fn kill(&mut self) -> Result<(), ProcessError> {
        match self.child.kill() {
            Ok(()) => {}
            // Already exited.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        let status = self.child.wait()?;
        self.done = true;
        self.join_drain()?;
        tracing::warn!(parent: &self.span, process = %self.program, %status, "killed");
        Ok(())
    }

    pub fn take_stdout(&mut self) -> Result<ChildStdout, ProcessError> {
        self.child.stdout.take().ok_or_else(|| ProcessError::Output("stdout not piped".into()))
    }

    pub fn take_stdin(&mut self) -> Result<ChildStdin, ProcessError> {
        self.child.stdin.take().ok_or_else(|| ProcessError::Output("stdin not piped".into()))
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.kill();
        }
    }
}

pub struct ProcessSendStream {
    stdout: ChildStdout,
    handle: ProcessHandle,
}

impl ProcessSendStream {
    pub fn spawn(cmd: Command, program: &str, span: &Span) -> Result<Self, ProcessError> {
        let mut handle = ProcessHandle::spawn(cmd, program, span, Stdio::null(), Stdio::piped())?;
        let stdout = handle.take_stdout()?;
        Ok(Self { stdout, handle })
    }
}

impl Read for ProcessSendStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl SendStream for ProcessSendStream {
    fn close(self: Box<Self>) -> Result<(), ProcessError> {
        let ProcessSendStream { stdout, mut handle } = *self;
        drop(stdout);
        handle.wait()
    }

    fn kill(self: Box<Self>) -> Result<(), ProcessError> {
        let ProcessSendStream { stdout, mut handle } = *self;
        drop(stdout);
        handle.kill()
    }
}

pub struct ProcessReceiveStream {
    stdin: BufWriter<ChildStdin>,
    handle: ProcessHandle,
}

impl ProcessReceiveStream {
    pub fn spawn(cmd: Command, program: &str, span: &Span) -> Result<Self, ProcessError> {
        let mut handle = ProcessHandle::spawn(cmd, program, span, Stdio::piped(), Stdio::null())?;
        let stdin = BufWriter::new(handle.take_stdin()?);
        Ok(Self { stdin, handle })
    }
}

impl Write for ProcessReceiveStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdin.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdin.flush()
    }
}

impl ReceiveStream for ProcessReceiveStream {
    fn close(self: Box<Self>) -> Result<(), ProcessError> {
        let ProcessReceiveStream { mut stdin, mut handle } = *self;
        let flushed = stdin.flush();
        // Dropping stdin is the child's EOF.
        drop(stdin);
        let waited = handle.wait();
        flushed?;
        waited
    }

    fn kill(self: Box<Self>) -> Result<(), ProcessError> {
        let ProcessReceiveStream { stdin, mut handle } = *self;
        // Buffered bytes are abandoned: flushing into a stuck child would block.
        let (raw, _unflushed) = stdin.into_parts();
        let killed = handle.kill();
        drop(raw);
        killed
    }
}
