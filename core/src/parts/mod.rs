//! parts/mod.rs
//! Part files: naming, writing, reading, and the directory queue.

pub mod naming;
pub mod writer;
pub mod reader;
pub mod queue;

pub use naming::*;
pub use writer::*;
pub use reader::*;
pub use queue::*;
