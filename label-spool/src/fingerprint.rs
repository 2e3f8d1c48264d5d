//! Content fingerprinting for duplicate-submission suppression

use sha2::{Digest, Sha256};

/// Compute a stable fingerprint for a job's content and quantity.
///
/// Used purely as a dedup map key over a short suppression window, so low
/// collision probability is all that matters. Quantity is hashed behind a
/// separator byte so `("ab", 1)` and `("a", 11)` cannot collide structurally.
pub fn fingerprint(content: &str, quantity: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update([0x1f]);
    hasher.update(quantity.to_le_bytes());
    hex::encode(hasher.finalize())
}
