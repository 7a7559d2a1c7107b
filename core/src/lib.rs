//! snapship-core
//!
//! Snapshot replication over a directory of encrypted part files.
//! The sender cuts `zfs send` streams into compressed, encrypted, size-bounded
//! parts; the receiver replays them in order into `zfs receive`.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;
pub mod context;

// Primitives
pub mod compression;
pub mod crypto;
pub mod codec;
pub mod framing;
pub mod telemetry;

// Part files
pub mod parts;

// Snapshots and external processes
pub mod snapshot;
pub mod zfs;
pub mod remote;

// Drivers
pub mod sender;
pub mod receiver;
pub mod backup;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::backup::{BackupDriver, BackupReport};
    pub use crate::config::{Config, HashTiming};
    pub use crate::context::Context;
    pub use crate::parts::{FilePartDirectory, PartName, PartPoll, StreamName};
    pub use crate::receiver::{CancelToken, RestoreDriver, RestoreOutcome, RestoreReport};
    pub use crate::remote::{DirectoryStore, RemoteStore};
    pub use crate::sender::{SendOp, SendStrategy, SnapshotSender};
    pub use crate::snapshot::{FilesystemSnapshots, Snapshot};
    pub use crate::types::BackupError;
    pub use crate::zfs::{FilesystemLister, ProcessFactory, ZfsCommands};
}
