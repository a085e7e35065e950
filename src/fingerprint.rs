//! Corpus fingerprinting
//!
//! A SHA-256 digest over the sorted (path, bytes) resource bag gives every
//! snapshot a content identity: two snapshots with the same fingerprint
//! were built from byte-identical corpora.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content identity of a loaded corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digest a resource bag. Resources are sorted by path first so the
    /// fingerprint does not depend on discovery order.
    pub fn of_resources<'a>(resources: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let mut sorted: Vec<_> = resources.into_iter().collect();
        sorted.sort_by_key(|(path, _)| *path);

        let mut hasher = Sha256::new();
        for (path, bytes) in sorted {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update(bytes);
            hasher.update([0u8]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = Fingerprint::of_resources([
            ("cars/car-sedan-1.json", b"{}".as_slice()),
            ("engines/engine-gas-1.json", b"{}".as_slice()),
        ]);
        let b = Fingerprint::of_resources([
            ("engines/engine-gas-1.json", b"{}".as_slice()),
            ("cars/car-sedan-1.json", b"{}".as_slice()),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Fingerprint::of_resources([("a.json", b"{}".as_slice())]);
        let b = Fingerprint::of_resources([("a.json", b"{ }".as_slice())]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_tracks_paths() {
        let a = Fingerprint::of_resources([("a.json", b"{}".as_slice())]);
        let b = Fingerprint::of_resources([("b.json", b"{}".as_slice())]);
        assert_ne!(a, b);
    }
}
