//! Content hashing for the image store
//!
//! Store keys are lowercase-hex SHA-256 digests of the final encoded bytes.
//! Hashing the post-constraint bytes (not the raw capture) guarantees that
//! identical delivered images always map to the same key.

use sha2::{Digest, Sha256};

/// Computes the content hash (lowercase hex SHA-256) of the given bytes
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        // infallible for String
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = content_hash(b"screenshot bytes");
        let b = content_hash(b"screenshot bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_differs_for_different_content() {
        assert_ne!(content_hash(b"one"), content_hash(b"two"));
    }

    #[test]
    fn test_hash_is_lowercase_hex_sha256() {
        let hash = content_hash(b"");
        // SHA-256 of the empty string is a well-known digest.
        assert_eq!(hash, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
        assert_eq!(hash.len(), 64);
    }
}
