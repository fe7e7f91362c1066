//! Durable per-step attempt results.
//!
//! [`AttemptStore`] persists the last scored attempt per
//! `(course, lesson, step)` key as a single JSON map file so progress
//! survives navigation and restarts.
//!
//! Persistence failures are deliberately non-fatal: a write error is logged
//! and swallowed, and a missing or corrupt file loads as an empty map. Losing
//! a stored attempt must never interrupt a practice session.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ItemKey;

// ---------------------------------------------------------------------------
// AttemptResult
// ---------------------------------------------------------------------------

/// Persisted outcome of one scored attempt for a given step.
///
/// At most one record is retained per key — each new attempt overwrites the
/// previous one, but `attempt_count` keeps accumulating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub course_id: String,
    pub lesson_id: String,
    pub step_index: u32,
    /// Recognized transcript, if recognition produced one.
    pub heard_text: Option<String>,
    /// Transliteration of the recognized transcript, if available.
    pub heard_translit: Option<String>,
    /// Similarity score in `[0, 100]`.
    pub confidence_score: u8,
    /// Monotonic attempt counter for this step.
    pub attempt_count: u32,
    /// Path of the audio artifact of the last attempt, for replay.
    pub last_attempt_audio_path: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AttemptResult {
    /// The store key for this result, `course|lesson|index`.
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.course_id.clone(), self.lesson_id.clone(), self.step_index)
    }
}

// ---------------------------------------------------------------------------
// AttemptStore
// ---------------------------------------------------------------------------

/// File-backed map from step key to the last [`AttemptResult`].
///
/// The whole map is rewritten on every save — attempt records are tiny and
/// infrequent, so a read-modify-write of one JSON file keeps the layout
/// trivially inspectable.
pub struct AttemptStore {
    results: BTreeMap<String, AttemptResult>,
    path: PathBuf,
}

impl AttemptStore {
    /// Open the store at `path`, loading existing results. A missing or
    /// corrupt file yields an empty store.
    pub fn open(path: PathBuf) -> Self {
        let results = if path.exists() {
            let data = std::fs::read_to_string(&path).unwrap_or_default();
            serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("attempt store: corrupt file, starting empty: {e}");
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Self { results, path }
    }

    /// Persist `result` under its own key, overwriting any prior record.
    ///
    /// Write failures are logged and swallowed.
    pub fn save(&mut self, result: AttemptResult) {
        let key = result.key().to_string();
        self.results.insert(key, result);
        if let Err(e) = self.flush() {
            log::warn!("attempt store: write failed (result kept in memory): {e}");
        }
    }

    /// The stored result for `key`, if any.
    pub fn load(&self, key: &ItemKey) -> Option<&AttemptResult> {
        self.results.get(&key.to_string())
    }

    /// All stored results, keyed by `course|lesson|index`.
    pub fn load_all(&self) -> &BTreeMap<String, AttemptResult> {
        &self.results
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` when nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.results)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn result(course: &str, lesson: &str, index: u32, score: u8, count: u32) -> AttemptResult {
        AttemptResult {
            course_id: course.into(),
            lesson_id: lesson.into(),
            step_index: index,
            heard_text: Some("สวัสดี".into()),
            heard_translit: None,
            confidence_score: score,
            attempt_count: count,
            last_attempt_audio_path: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("attempts.json");

        let mut store = AttemptStore::open(path.clone());
        store.save(result("c1", "l1", 0, 85, 1));

        let reopened = AttemptStore::open(path);
        let loaded = reopened.load(&ItemKey::new("c1", "l1", 0)).expect("stored");
        assert_eq!(loaded.confidence_score, 85);
        assert_eq!(loaded.heard_text.as_deref(), Some("สวัสดี"));
    }

    #[test]
    fn new_attempt_overwrites_but_count_accumulates() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = AttemptStore::open(dir.path().join("attempts.json"));

        store.save(result("c1", "l1", 0, 40, 1));
        store.save(result("c1", "l1", 0, 90, 2));

        assert_eq!(store.len(), 1);
        let loaded = store.load(&ItemKey::new("c1", "l1", 0)).unwrap();
        assert_eq!(loaded.confidence_score, 90);
        assert_eq!(loaded.attempt_count, 2);
    }

    #[test]
    fn distinct_keys_are_kept_separately() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = AttemptStore::open(dir.path().join("attempts.json"));

        store.save(result("c1", "l1", 0, 50, 1));
        store.save(result("c1", "l1", 1, 60, 1));
        store.save(result("c1", "l2", 0, 70, 1));

        assert_eq!(store.len(), 3);
        assert_eq!(store.load_all().len(), 3);
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = AttemptStore::open(dir.path().join("nonexistent.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("attempts.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = AttemptStore::open(path);
        assert!(store.is_empty());
    }

    #[test]
    fn write_failure_is_swallowed() {
        // A directory path can't be written as a file; save must not panic.
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = AttemptStore::open(dir.path().to_path_buf());
        store.save(result("c1", "l1", 0, 10, 1));
        // The in-memory record is still there.
        assert_eq!(store.len(), 1);
    }
}
