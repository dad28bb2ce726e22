//! Cryptographic utilities
//!
//! SHA-256 hashing and address derivation.

pub mod hash;

pub use hash::{derive_address, sha256, sha256_hex, ADDRESS_HEX_LEN};
