//! Entry key generation.

use sha2::{Digest, Sha256};

/// Compute the primary key of a stored response.
///
/// Scoped by cache name so the same URL can live in several named caches.
pub fn compute_entry_key(cache_name: &str, identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cache_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(identity.as_bytes());
    hex::encode(hasher.finalize())
}
