//! Integrity descriptor helpers.

use base64::Engine;
use sha2::{Digest, Sha256, Sha384, Sha512};

fn encode(algorithm: &str, digest: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(digest);
    format!("{algorithm}-{b64}")
}

/// `sha256-<base64>` descriptor for `data`.
#[must_use]
pub fn sri_sha256(data: &[u8]) -> String {
    encode("sha256", &Sha256::digest(data))
}

/// `sha384-<base64>` descriptor for `data`.
#[must_use]
pub fn sri_sha384(data: &[u8]) -> String {
    encode("sha384", &Sha384::digest(data))
}

/// `sha512-<base64>` descriptor for `data`.
#[must_use]
pub fn sri_sha512(data: &[u8]) -> String {
    encode("sha512", &Sha512::digest(data))
}
