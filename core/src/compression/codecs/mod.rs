//! compression/codecs/mod.rs
//! Concrete per-chunk codecs.

pub mod deflate;
pub mod lz4;
pub mod stored;
pub mod zstd;

pub use deflate::*;
pub use lz4::*;
pub use stored::*;
pub use zstd::*;
