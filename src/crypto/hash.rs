//! Cryptographic hashing utilities for the ledger
//!
//! Provides SHA-256 based hashing functions used for block hashes
//! and the proof-of-work puzzle.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks whether a hex digest starts with `difficulty` `'0'` digits
///
/// A difficulty larger than the digest length can never be met.
pub fn has_leading_hex_zeros(digest_hex: &str, difficulty: u32) -> bool {
    let required = difficulty as usize;
    if required > digest_hex.len() {
        return false;
    }
    digest_hex.bytes().take(required).all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.len(), 32);
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_leading_hex_zeros() {
        assert!(has_leading_hex_zeros("0000ab", 4));
        assert!(has_leading_hex_zeros("0000ab", 3));
        assert!(!has_leading_hex_zeros("000ab0", 4));
        assert!(has_leading_hex_zeros("abc", 0));
    }

    #[test]
    fn test_difficulty_beyond_digest_length() {
        assert!(!has_leading_hex_zeros("000", 4));
    }
}
