use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Prefix shared by every generated analysis id
pub const ANALYSIS_ID_PREFIX: &str = "an_";

/// Generates a collision-resistant analysis id
///
/// Hashes the subject together with the wall clock and a process-wide
/// sequence number, so two submissions of the same creator in the same
/// nanosecond still get distinct ids.
pub fn generate_analysis_id(seed: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    let digest = hasher.finalize();

    format!("{}{}", ANALYSIS_ID_PREFIX, hex::encode(&digest[..10]))
}
