//! Stable cache-key hashing for free-text search queries.

use sha2::{Digest, Sha256};

/// Normalize a search query: surrounding whitespace trimmed, lower-cased.
///
/// Searches are case-insensitive, so queries differing only in case share
/// a cache entry and a result set.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Hex SHA-256 of the normalized query, bounding key length.
pub fn hash_query(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        assert_eq!(hash_query("scout rush"), hash_query("scout rush"));
    }

    #[test]
    fn test_hash_normalizes_case_and_whitespace() {
        assert_eq!(hash_query("  Scout RUSH "), hash_query("scout rush"));
    }

    #[test]
    fn test_hash_distinguishes_queries() {
        assert_ne!(hash_query("scout"), hash_query("archer"));
    }

    #[test]
    fn test_hash_format() {
        let hash = hash_query("fast castle");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
