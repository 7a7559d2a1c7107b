//! remote/mod.rs
//! Remote store collaborator.

pub mod types;
pub mod directory;

pub use types::*;
pub use directory::*;
