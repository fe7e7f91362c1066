//! Favorites reference parsing.
//!
//! Favorites storage hands the engine opaque reference strings of the shape
//!
//! ```text
//! step:<courseId>:<lessonId>:idx<index>[:...]
//! ```
//!
//! Trailing segments are ignored (the host app appends display metadata).
//! Malformed entries are skipped by the caller, never errors.

use crate::content::ItemKey;

/// Parse one favorites reference into a canonical [`ItemKey`].
///
/// Returns `None` for anything that does not match the documented shape:
/// wrong prefix, missing segments, empty ids, or a non-numeric index.
///
/// ```
/// use thai_practice::progress::parse_favorite_ref;
///
/// let key = parse_favorite_ref("step:th-basics:greetings:idx3").unwrap();
/// assert_eq!(key.index, 3);
/// assert!(parse_favorite_ref("word:th-basics:greetings:idx3").is_none());
/// ```
pub fn parse_favorite_ref(reference: &str) -> Option<ItemKey> {
    let mut parts = reference.split(':');

    if parts.next()? != "step" {
        return None;
    }

    let course_id = parts.next().filter(|s| !s.is_empty())?;
    let lesson_id = parts.next().filter(|s| !s.is_empty())?;
    let index = parts
        .next()?
        .strip_prefix("idx")?
        .parse::<u32>()
        .ok()?;

    Some(ItemKey::new(course_id, lesson_id, index))
}
