//! crypto/mod.rs
//! AEAD, password key derivation, per-record IVs, and part digests.

pub mod types;
pub mod aead;
pub mod kdf;
pub mod nonce;
pub mod digest;

pub use types::*;
pub use aead::*;
pub use kdf::*;
pub use nonce::*;
pub use digest::*;
