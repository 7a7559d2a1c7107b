//! receiver/mod.rs
//! Restore side: continuity decisions, cancellation, and the restore loop.

pub mod continuity;
pub mod cancel;
pub mod restore;

pub use continuity::*;
pub use cancel::*;
pub use restore::*;
