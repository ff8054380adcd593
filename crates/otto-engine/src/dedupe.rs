//! Shared dedupe-key fingerprinting (spec §4.G, §4.H: `sha256-16(...)`).

use sha2::{Digest, Sha256};

/// First 16 hex characters (8 bytes) of the SHA-256 digest of `input`.
pub fn sha256_16(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_16_is_deterministic_and_16_chars() {
        let a = sha256_16("777:2026-07-28:morning");
        let b = sha256_16("777:2026-07-28:morning");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn sha256_16_differs_on_different_input() {
        assert_ne!(sha256_16("a"), sha256_16("b"));
    }
}
