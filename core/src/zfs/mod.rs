//! zfs/mod.rs
//! External send/receive/list processes.

pub mod types;
pub mod process;
pub mod commands;

pub use types::*;
pub use process::*;
pub use commands::*;
