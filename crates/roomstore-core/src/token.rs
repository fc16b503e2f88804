use sha2::{Digest, Sha256};

/// Content-derived version token, as used by the in-process and local stores.
///
/// Hashes a git-style `blob <len>\0` header followed by the content, so equal
/// content always yields the same token.
pub fn content_sha(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_sha_is_stable() {
        assert_eq!(content_sha(b"hello"), content_sha(b"hello"));
        assert_ne!(content_sha(b"hello"), content_sha(b"hello!"));
        assert_eq!(content_sha(b"").len(), 64);
    }
}
