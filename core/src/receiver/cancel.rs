//! receiver/cancel.rs
//! Cooperative cancellation backed by a crossbeam channel.
//!
//! `wait` is the restore loop's only blocking call: it returns early when the
//! token is cancelled and otherwise after the timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Elapsed,
    Cancelled,
}

#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { cancelled: Arc::new(AtomicBool::new(false)), tx, rx }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // A full channel already holds a wake-up.
        let _ = self.tx.try_send(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn wait(&self, timeout: Duration) -> Wake {
        if self.is_cancelled() {
            return Wake::Cancelled;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(()) => Wake::Cancelled,
            Err(RecvTimeoutError::Timeout) if self.is_cancelled() => Wake::Cancelled,
            Err(RecvTimeoutError::Timeout) => Wake::Elapsed,
            // Unreachable while `self` holds a sender.
            Err(RecvTimeoutError::Disconnected) => Wake::Cancelled,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
