//! ID generation for doctree entities
//!
//! Hash-based IDs keep clones merge-friendly and avoid a counter in the index.
//! Format: {prefix}-xxxxxxxx (8 lowercase alphanumeric chars).

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a unique entity ID
///
/// Uses UUID + timestamp hash, encoded as base32 lowercase.
pub fn generate_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4();
    let timestamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);

    let mut hasher = Sha256::new();
    hasher.update(uuid.as_bytes());
    hasher.update(timestamp.to_le_bytes());

    let hash = hasher.finalize();

    let encoded = base32::encode(base32::Alphabet::Crockford, &hash[..8])
        .to_lowercase()
        .chars()
        .take(8)
        .collect::<String>();

    format!("{}-{}", prefix, encoded)
}

/// Parse an entity ID into prefix and hash
pub fn parse_id(id: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = id.splitn(2, '-').collect();
    if parts.len() == 2 {
        Some((parts[0], parts[1]))
    } else {
        None
    }
}
