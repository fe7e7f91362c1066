//! Learner progress snapshot — read-only input for queue building.
//!
//! The snapshot arrives as loosely-shaped JSON written by the host app
//! ([`RawProgress`]). Instead of probing fields defensively at every read,
//! the shape is validated and normalized exactly once into the typed
//! [`ProgressSnapshot`]: string `course|lesson` keys are parsed, negative or
//! duplicate step indices dropped, empty ids discarded. Anything dropped is
//! logged and never fatal.

pub mod favorites;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use favorites::parse_favorite_ref;

// ---------------------------------------------------------------------------
// LessonKey
// ---------------------------------------------------------------------------

/// Identity of a lesson: `(course, lesson)`.
///
/// Ordering is lexicographic by course id then lesson id — the deterministic
/// tie-break used when several candidate lessons exist.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LessonKey {
    pub course_id: String,
    pub lesson_id: String,
}

impl LessonKey {
    pub fn new(course_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            lesson_id: lesson_id.into(),
        }
    }

    /// Parse the host app's `course|lesson` string key.
    fn parse(raw: &str) -> Option<Self> {
        let (course, lesson) = raw.split_once('|')?;
        if course.is_empty() || lesson.is_empty() {
            return None;
        }
        Some(Self::new(course, lesson))
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.course_id, self.lesson_id)
    }
}

// ---------------------------------------------------------------------------
// RawProgress  (as persisted by the host app)
// ---------------------------------------------------------------------------

/// Lenient on-disk shape of the progress snapshot.
///
/// Every field defaults so a partial or older file still loads; values are
/// sanitised by [`ProgressSnapshot::from_raw`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProgress {
    /// Last course the learner had open.
    #[serde(default)]
    pub last_active_course: Option<String>,
    /// Last lesson per course id.
    #[serde(default)]
    pub last_active_lesson: HashMap<String, String>,
    /// Lessons the learner has started, per course id.
    #[serde(default)]
    pub started_lessons: HashMap<String, Vec<String>>,
    /// Learned step indices per `course|lesson` key. Signed because older
    /// app versions persisted platform integers.
    #[serde(default)]
    pub learned_steps: HashMap<String, Vec<i64>>,
    /// Last-visited step index per `course|lesson` key.
    #[serde(default)]
    pub last_step_index: HashMap<String, i64>,
}

// ---------------------------------------------------------------------------
// ProgressSnapshot
// ---------------------------------------------------------------------------

/// Validated, typed view of the learner's progress. Read-only for this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Last active course id, if any.
    pub last_active_course: Option<String>,
    /// Last active lesson id per course id.
    pub last_active_lesson: BTreeMap<String, String>,
    /// Started lesson ids per course id.
    pub started_lessons: BTreeMap<String, BTreeSet<String>>,
    /// Learned step indices per lesson.
    pub learned_steps: BTreeMap<LessonKey, BTreeSet<u32>>,
    /// Last-visited step index per lesson (probe hint).
    pub last_step_index: BTreeMap<LessonKey, u32>,
}

impl ProgressSnapshot {
    /// Normalize a raw snapshot into the typed shape, dropping malformed
    /// entries with a warning.
    pub fn from_raw(raw: RawProgress) -> Self {
        let mut learned_steps: BTreeMap<LessonKey, BTreeSet<u32>> = BTreeMap::new();
        for (raw_key, indices) in raw.learned_steps {
            let Some(key) = LessonKey::parse(&raw_key) else {
                log::warn!("progress: dropping learned-steps entry with bad key {raw_key:?}");
                continue;
            };
            let set: BTreeSet<u32> = indices
                .into_iter()
                .filter_map(|i| match u32::try_from(i) {
                    Ok(i) => Some(i),
                    Err(_) => {
                        log::warn!("progress: dropping out-of-range step index {i} for {key}");
                        None
                    }
                })
                .collect();
            learned_steps.insert(key, set);
        }

        let mut last_step_index: BTreeMap<LessonKey, u32> = BTreeMap::new();
        for (raw_key, index) in raw.last_step_index {
            let Some(key) = LessonKey::parse(&raw_key) else {
                log::warn!("progress: dropping last-step entry with bad key {raw_key:?}");
                continue;
            };
            match u32::try_from(index) {
                Ok(i) => {
                    last_step_index.insert(key, i);
                }
                Err(_) => {
                    log::warn!("progress: dropping out-of-range last step {index} for {key}");
                }
            }
        }

        let started_lessons = raw
            .started_lessons
            .into_iter()
            .filter(|(course, _)| !course.is_empty())
            .map(|(course, lessons)| {
                let set = lessons.into_iter().filter(|l| !l.is_empty()).collect();
                (course, set)
            })
            .collect();

        let last_active_lesson = raw
            .last_active_lesson
            .into_iter()
            .filter(|(course, lesson)| !course.is_empty() && !lesson.is_empty())
            .collect();

        let last_active_course = raw.last_active_course.filter(|c| !c.is_empty());

        Self {
            last_active_course,
            last_active_lesson,
            started_lessons,
            learned_steps,
            last_step_index,
        }
    }

    /// Load and normalize the snapshot from a JSON file. A missing or corrupt
    /// file yields an empty snapshot (logged, never fatal).
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| log::warn!("progress: read failed: {e}"))
            .ok()
            .and_then(|data| {
                serde_json::from_str(&data)
                    .map_err(|e| log::warn!("progress: parse failed, treating as empty: {e}"))
                    .ok()
            })
            .unwrap_or_default();
        Self::from_raw(raw)
    }

    /// Every lesson the snapshot knows anything about, in deterministic
    /// order. Used as the candidate pool for daily picks.
    pub fn known_lessons(&self) -> BTreeSet<LessonKey> {
        let mut keys: BTreeSet<LessonKey> = self.learned_steps.keys().cloned().collect();
        keys.extend(self.last_step_index.keys().cloned());
        for (course, lessons) in &self.started_lessons {
            for lesson in lessons {
                keys.insert(LessonKey::new(course.clone(), lesson.clone()));
            }
        }
        keys
    }

    /// The "active" lesson, resolved in priority order:
    ///
    /// 1. last active course + its last active lesson,
    /// 2. any started lesson (lexicographically smallest),
    /// 3. any lesson with recorded progress (lexicographically smallest).
    pub fn active_lesson(&self) -> Option<LessonKey> {
        if let Some(course) = &self.last_active_course {
            if let Some(lesson) = self.last_active_lesson.get(course) {
                return Some(LessonKey::new(course.clone(), lesson.clone()));
            }
        }

        // BTree iteration order makes the first entry the tie-break winner.
        if let Some((course, lesson)) = self
            .started_lessons
            .iter()
            .find_map(|(course, lessons)| lessons.iter().next().map(|l| (course, l)))
        {
            return Some(LessonKey::new(course.clone(), lesson.clone()));
        }

        self.learned_steps
            .keys()
            .chain(self.last_step_index.keys())
            .min()
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_drops_negative_indices_and_bad_keys() {
        let mut raw = RawProgress::default();
        raw.learned_steps
            .insert("c1|l1".into(), vec![0, -3, 2, 2, 7]);
        raw.learned_steps.insert("no-separator".into(), vec![1]);
        raw.last_step_index.insert("c1|l1".into(), 7);
        raw.last_step_index.insert("c1|l2".into(), -1);

        let snap = ProgressSnapshot::from_raw(raw);
        let key = LessonKey::new("c1", "l1");
        assert_eq!(
            snap.learned_steps.get(&key),
            Some(&BTreeSet::from([0, 2, 7]))
        );
        assert_eq!(snap.learned_steps.len(), 1);
        assert_eq!(snap.last_step_index.get(&key), Some(&7));
        assert!(!snap.last_step_index.contains_key(&LessonKey::new("c1", "l2")));
    }

    #[test]
    fn active_lesson_prefers_last_active() {
        let mut snap = ProgressSnapshot::default();
        snap.last_active_course = Some("c2".into());
        snap.last_active_lesson.insert("c2".into(), "l5".into());
        snap.started_lessons
            .insert("c1".into(), BTreeSet::from(["l1".to_string()]));

        assert_eq!(snap.active_lesson(), Some(LessonKey::new("c2", "l5")));
    }

    #[test]
    fn active_lesson_falls_back_to_started_then_progress() {
        let mut snap = ProgressSnapshot::default();
        snap.started_lessons
            .insert("c1".into(), BTreeSet::from(["l2".to_string(), "l1".to_string()]));
        assert_eq!(snap.active_lesson(), Some(LessonKey::new("c1", "l1")));

        let mut snap = ProgressSnapshot::default();
        snap.learned_steps
            .insert(LessonKey::new("c3", "l9"), BTreeSet::from([0]));
        snap.last_step_index.insert(LessonKey::new("c1", "l1"), 4);
        assert_eq!(snap.active_lesson(), Some(LessonKey::new("c1", "l1")));
    }

    #[test]
    fn active_lesson_none_when_empty() {
        assert_eq!(ProgressSnapshot::default().active_lesson(), None);
    }

    #[test]
    fn active_lesson_ignores_dangling_last_active_course() {
        // Course marked active but no lesson recorded for it.
        let mut snap = ProgressSnapshot::default();
        snap.last_active_course = Some("c9".into());
        snap.started_lessons
            .insert("c1".into(), BTreeSet::from(["l1".to_string()]));
        assert_eq!(snap.active_lesson(), Some(LessonKey::new("c1", "l1")));
    }

    #[test]
    fn known_lessons_unions_all_sources() {
        let mut snap = ProgressSnapshot::default();
        snap.learned_steps
            .insert(LessonKey::new("c1", "l1"), BTreeSet::new());
        snap.last_step_index.insert(LessonKey::new("c1", "l2"), 3);
        snap.started_lessons
            .insert("c2".into(), BTreeSet::from(["l1".to_string()]));

        let keys = snap.known_lessons();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&LessonKey::new("c2", "l1")));
    }

    #[test]
    fn load_missing_or_corrupt_file_is_empty() {
        assert_eq!(
            ProgressSnapshot::load_from(Path::new("/nonexistent/progress.json")),
            ProgressSnapshot::default()
        );

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(ProgressSnapshot::load_from(&path), ProgressSnapshot::default());
    }

    #[test]
    fn load_round_trips_through_raw_json() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("progress.json");
        let json = serde_json::json!({
            "last_active_course": "c1",
            "last_active_lesson": { "c1": "l1" },
            "learned_steps": { "c1|l1": [0, 1, 2] },
            "last_step_index": { "c1|l1": 2 }
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let snap = ProgressSnapshot::load_from(&path);
        assert_eq!(snap.active_lesson(), Some(LessonKey::new("c1", "l1")));
        assert_eq!(
            snap.learned_steps[&LessonKey::new("c1", "l1")],
            BTreeSet::from([0, 1, 2])
        );
    }
}
