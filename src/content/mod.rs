//! Lesson content — practice items and the content lookup capability.
//!
//! [`ContentLookup`] is the seam between the practice engine and whatever
//! actually stores lesson material. The engine only ever asks it to resolve
//! a canonical `(course, lesson, index)` triple into a [`PracticeItem`];
//! a `None` answer means "no such step" and is never an error.
//!
//! [`LessonLibrary`] is the bundled implementation: a flat JSON file of
//! lesson entries loaded into memory at startup.

pub mod identity;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use identity::stable_item_id;

// ---------------------------------------------------------------------------
// ItemKey
// ---------------------------------------------------------------------------

/// Canonical identity of a practice step: `(course, lesson, index)`.
///
/// Ordering is lexicographic by course id, then lesson id, then index — the
/// stable queue order. `Display` renders the persisted-store key format
/// `course|lesson|index`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub course_id: String,
    pub lesson_id: String,
    pub index: u32,
}

impl ItemKey {
    pub fn new(course_id: impl Into<String>, lesson_id: impl Into<String>, index: u32) -> Self {
        Self {
            course_id: course_id.into(),
            lesson_id: lesson_id.into(),
            index,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.course_id, self.lesson_id, self.index)
    }
}

// ---------------------------------------------------------------------------
// PracticeItem
// ---------------------------------------------------------------------------

/// One resolved, renderable practice unit.
///
/// Immutable once built; rebuilt whenever the queue is rebuilt. Identity
/// ([`PracticeItem::id`]) is derived from the key alone — never from the
/// display text, so it survives localization and copy edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeItem {
    /// Canonical `(course, lesson, index)` key.
    pub key: ItemKey,
    /// Reference phrase in Thai script — what the learner should say.
    pub phrase: String,
    /// Phonetic transliteration of the phrase.
    pub transliteration: String,
    /// Native-language gloss.
    pub gloss: String,
}

impl PracticeItem {
    /// Deterministic UUID-shaped identifier, a pure function of the key.
    pub fn id(&self) -> Uuid {
        stable_item_id(&self.key.course_id, &self.key.lesson_id, self.key.index)
    }
}

// ---------------------------------------------------------------------------
// ContentLookup
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe capability that resolves canonical step ids to
/// practice items.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn ContentLookup>` and consulted from the recognition task.
pub trait ContentLookup: Send + Sync {
    /// Resolve a step, or `None` when no content exists at that index.
    fn resolve(&self, course_id: &str, lesson_id: &str, index: u32) -> Option<PracticeItem>;
}

// Compile-time assertion: Box<dyn ContentLookup> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ContentLookup>) {}
};

// ---------------------------------------------------------------------------
// LessonLibrary
// ---------------------------------------------------------------------------

/// Serialized shape of one lesson-content entry in the library JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonEntry {
    pub course_id: String,
    pub lesson_id: String,
    pub index: u32,
    pub phrase: String,
    #[serde(default)]
    pub transliteration: String,
    #[serde(default)]
    pub gloss: String,
}

/// In-memory [`ContentLookup`] backed by a flat JSON array of
/// [`LessonEntry`] records.
pub struct LessonLibrary {
    entries: HashMap<ItemKey, LessonEntry>,
}

impl LessonLibrary {
    /// Build a library from already-deserialized entries.
    ///
    /// Later duplicates of the same key replace earlier ones.
    pub fn new(entries: Vec<LessonEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (ItemKey::new(&e.course_id, &e.lesson_id, e.index), e))
            .collect();
        Self { entries }
    }

    /// Load a library from a JSON file, or return an empty library when the
    /// file is missing or unreadable (logged, never fatal).
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!("lesson library not found at {}, starting empty", path.display());
            return Self::new(Vec::new());
        }
        let entries = std::fs::read_to_string(path)
            .map_err(|e| log::warn!("failed to read lesson library: {e}"))
            .ok()
            .and_then(|data| {
                serde_json::from_str(&data)
                    .map_err(|e| log::warn!("failed to parse lesson library: {e}"))
                    .ok()
            })
            .unwrap_or_default();
        Self::new(entries)
    }

    /// Number of entries in the library.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the library holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentLookup for LessonLibrary {
    fn resolve(&self, course_id: &str, lesson_id: &str, index: u32) -> Option<PracticeItem> {
        let key = ItemKey::new(course_id, lesson_id, index);
        self.entries.get(&key).map(|e| PracticeItem {
            key,
            phrase: e.phrase.clone(),
            transliteration: e.transliteration.clone(),
            gloss: e.gloss.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
