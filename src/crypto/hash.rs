//! Hashing utilities
//!
//! SHA-256 helpers used for transaction ids and deterministic
//! token/sale addresses.

use sha2::{Digest, Sha256};

/// Length of an address in hex characters, without the `0x` prefix
pub const ADDRESS_HEX_LEN: usize = 40;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derive a `0x`-prefixed address from a deployment seed
///
/// The seed should include the deployer and a nonce so that repeated
/// deployments land on distinct addresses.
pub fn derive_address(seed: &str) -> String {
    let hex = sha256_hex(seed.as_bytes());
    format!("0x{}", &hex[..ADDRESS_HEX_LEN])
}
