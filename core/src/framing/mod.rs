//! framing/mod.rs
//! Length-prefixed, checksummed record framing.
//!
//! Notes:
//! - One record is buffered at a time; the ciphertext length is bounded before
//!   the body is allocated.
//! - The CRC covers IV and ciphertext so transport corruption is reported as a
//!   frame error instead of an AEAD tag failure.

pub mod types;
pub mod encode;
pub mod decode;
pub mod channel;

pub use types::*;
pub use encode::*;
pub use decode::*;
pub use channel::*;
