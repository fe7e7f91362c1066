//! Stable practice-item identity.
//!
//! The UI and the attempt store need an identifier that survives process
//! restarts, device changes, localization and copy edits. It is therefore a
//! pure function of the canonical `(course, lesson, index)` triple: the
//! joined string is hashed with SHA-256, the first 16 bytes become a
//! UUID-shaped value with the version/variant bits set so UUID-typed
//! consumers accept it. The value carries no other semantics.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive the deterministic identifier for a practice step.
///
/// Same inputs always yield the same UUID, across calls, restarts and
/// devices. Display text is never part of the input.
///
/// ```
/// use thai_practice::content::stable_item_id;
///
/// let a = stable_item_id("th-basics", "greetings", 0);
/// let b = stable_item_id("th-basics", "greetings", 0);
/// assert_eq!(a, b);
/// assert_ne!(a, stable_item_id("th-basics", "greetings", 1));
/// ```
pub fn stable_item_id(course_id: &str, lesson_id: &str, index: u32) -> Uuid {
    let canonical = format!("{course_id}|{lesson_id}|{index}");
    let digest = Sha256::digest(canonical.as_bytes());

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);

    uuid::Builder::from_bytes(bytes)
        .with_variant(uuid::Variant::RFC4122)
        .with_version(uuid::Version::Sha1)
        .into_uuid()
}
