//! Cryptographic primitives: Keccak-256 hashing and ed25519 signatures,
//! together with their byte and text encodings.

pub use fmt::*;

pub mod ed25519;
mod fmt;
pub mod keccak256;
