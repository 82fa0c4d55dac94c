//! Content hashing for cache keys. The key is contractually SHA-256.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of file content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = hash_content("def f(): pass");
        let b = hash_content("def f(): pass");
        let c = hash_content("def g(): pass");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
