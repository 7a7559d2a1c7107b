//! sender/mod.rs
//! Snapshot sender and its transfer strategies.

pub mod strategy;
pub mod ledger;
pub mod sender;

pub use strategy::*;
pub use ledger::*;
pub use sender::*;
