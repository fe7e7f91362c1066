//! Queue construction policies.
//!
//! All modes share two postconditions: the result is deduplicated by
//! `(course, lesson, index)` key, and — except for [`QueueMode::Random`] —
//! sorted ascending by that key.
//!
//! Items that fail to resolve through the content lookup are silently
//! skipped everywhere; missing content is expected, not an error.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use crate::content::{ContentLookup, ItemKey, PracticeItem};
use crate::progress::{LessonKey, ProgressSnapshot};

use super::QueueMode;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Consecutive unresolved indices tolerated after the first hit in the
/// current-lesson probe. Skips small content gaps without scanning forever.
pub const PROBE_MISS_TOLERANCE: u32 = 8;

/// Minimum index span scanned before the first hit.
const PROBE_MIN_SPAN: u32 = 32;

/// Absolute ceiling on the pre-first-hit scan.
pub const PROBE_CEILING: u32 = 200;

/// Size of the daily-picks fallback sample.
pub const DAILY_PICKS: usize = 5;

/// Indices probed per known lesson when gathering daily-pick candidates.
const DAILY_PROBE_SPAN: u32 = 16;

// ---------------------------------------------------------------------------
// QueueError
// ---------------------------------------------------------------------------

/// Errors the queue builder can surface.
///
/// These are presentation-level conditions, not failures: the session engine
/// converts them into an explicit hint state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The progress snapshot names no lesson the current-lesson mode could
    /// treat as active.
    #[error("no active lesson could be resolved from the progress snapshot")]
    NoActiveLesson,
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

/// Assemble the practice queue for `mode`.
///
/// `favorites` is the raw reference list from favorites storage; entries
/// that fail to parse or resolve are skipped.
pub fn build(
    mode: QueueMode,
    snapshot: &ProgressSnapshot,
    favorites: &[String],
    lookup: &dyn ContentLookup,
) -> Result<Vec<PracticeItem>, QueueError> {
    match mode {
        QueueMode::Learned => Ok(sorted(learned_pool(snapshot, lookup))),
        QueueMode::CurrentLesson => {
            let lesson = snapshot.active_lesson().ok_or(QueueError::NoActiveLesson)?;
            let hint = snapshot.last_step_index.get(&lesson).copied().unwrap_or(0);
            Ok(sorted(probe_lesson(&lesson, hint, lookup)))
        }
        QueueMode::Favorites => {
            let items = favorites
                .iter()
                .filter_map(|reference| {
                    let key = crate::progress::parse_favorite_ref(reference)?;
                    lookup.resolve(&key.course_id, &key.lesson_id, key.index)
                })
                .collect();
            Ok(sorted(items))
        }
        QueueMode::Random => {
            let mut items = sorted(learned_pool(snapshot, lookup));
            items.shuffle(&mut rand::rng());
            Ok(items)
        }
    }
}

// ---------------------------------------------------------------------------
// Learned pool & daily picks
// ---------------------------------------------------------------------------

/// Resolve every learned step; when nothing is learned yet, fall back to the
/// daily picks sample.
///
/// The fallback is decided by the learned *set*, not by what resolves: a
/// learner with learned steps whose content has since gone away gets an
/// empty queue, not substitute picks.
fn learned_pool(snapshot: &ProgressSnapshot, lookup: &dyn ContentLookup) -> Vec<PracticeItem> {
    if snapshot.learned_steps.values().all(|indices| indices.is_empty()) {
        let seed = Utc::now().timestamp().div_euclid(86_400) as u64;
        return daily_picks(snapshot, lookup, seed);
    }

    let mut items = Vec::new();
    for (lesson, indices) in &snapshot.learned_steps {
        for &index in indices {
            if let Some(item) = lookup.resolve(&lesson.course_id, &lesson.lesson_id, index) {
                items.push(item);
            }
        }
    }
    items
}

/// Fixed-size fallback sample, stable within a UTC day.
///
/// Candidates come from every lesson the snapshot knows about, probed over a
/// small bounded index span; the day number seeds the sampling RNG so the
/// same picks come back all day.
fn daily_picks(
    snapshot: &ProgressSnapshot,
    lookup: &dyn ContentLookup,
    seed: u64,
) -> Vec<PracticeItem> {
    let mut pool = Vec::new();
    for lesson in snapshot.known_lessons() {
        for index in 0..DAILY_PROBE_SPAN {
            if let Some(item) = lookup.resolve(&lesson.course_id, &lesson.lesson_id, index) {
                pool.push(item);
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    pool.shuffle(&mut rng);
    pool.truncate(DAILY_PICKS);
    pool
}

// ---------------------------------------------------------------------------
// Current-lesson probe
// ---------------------------------------------------------------------------

/// Scan step indices upward from 0 with bounded miss tolerance.
///
/// Before the first hit the scan stops once the index reaches
/// `min(max(32, hint + 32), 200)` — this bound applies in full even when the
/// lesson starts with a content gap. After the first hit it switches
/// permanently to the consecutive-miss rule: up to [`PROBE_MISS_TOLERANCE`]
/// unresolved indices in a row are skipped, one more stops the scan.
fn probe_lesson(
    lesson: &LessonKey,
    hint: u32,
    lookup: &dyn ContentLookup,
) -> Vec<PracticeItem> {
    let pre_hit_bound = PROBE_MIN_SPAN
        .max(hint.saturating_add(PROBE_MIN_SPAN))
        .min(PROBE_CEILING);

    let mut items: Vec<PracticeItem> = Vec::new();
    let mut misses = 0u32;
    let mut index = 0u32;

    loop {
        match lookup.resolve(&lesson.course_id, &lesson.lesson_id, index) {
            Some(item) => {
                items.push(item);
                misses = 0;
            }
            None if items.is_empty() => {
                if index >= pre_hit_bound {
                    break;
                }
            }
            None => {
                misses += 1;
                if misses > PROBE_MISS_TOLERANCE {
                    break;
                }
            }
        }
        index += 1;
    }

    items
}

// ---------------------------------------------------------------------------
// Dedup + stable order
// ---------------------------------------------------------------------------

/// Deduplicate by key and sort ascending by `(course, lesson, index)`.
fn sorted(items: Vec<PracticeItem>) -> Vec<PracticeItem> {
    let deduped: BTreeMap<ItemKey, PracticeItem> =
        items.into_iter().map(|item| (item.key.clone(), item)).collect();
    deduped.into_values().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::content::{LessonEntry, LessonLibrary};

    fn library(steps: &[(&str, &str, u32)]) -> LessonLibrary {
        let entries = steps
            .iter()
            .map(|(course, lesson, index)| LessonEntry {
                course_id: (*course).into(),
                lesson_id: (*lesson).into(),
                index: *index,
                phrase: format!("phrase-{course}-{lesson}-{index}"),
                transliteration: String::new(),
                gloss: String::new(),
            })
            .collect();
        LessonLibrary::new(entries)
    }

    fn snapshot_with_learned(lesson: LessonKey, indices: &[u32]) -> ProgressSnapshot {
        let mut snap = ProgressSnapshot::default();
        snap.learned_steps
            .insert(lesson, indices.iter().copied().collect::<BTreeSet<_>>());
        snap
    }

    fn keys(items: &[PracticeItem]) -> Vec<(String, String, u32)> {
        items
            .iter()
            .map(|i| (i.key.course_id.clone(), i.key.lesson_id.clone(), i.key.index))
            .collect()
    }

    // --- learned mode ---

    #[test]
    fn learned_mode_resolves_and_sorts() {
        let lib = library(&[("c1", "l1", 0), ("c1", "l1", 2), ("c1", "l2", 1)]);
        let mut snap = snapshot_with_learned(LessonKey::new("c1", "l2"), &[1]);
        snap.learned_steps
            .insert(LessonKey::new("c1", "l1"), BTreeSet::from([2, 0]));

        let queue = build(QueueMode::Learned, &snap, &[], &lib).unwrap();
        assert_eq!(
            keys(&queue),
            vec![
                ("c1".into(), "l1".into(), 0),
                ("c1".into(), "l1".into(), 2),
                ("c1".into(), "l2".into(), 1),
            ]
        );
    }

    #[test]
    fn learned_mode_skips_unresolvable_steps() {
        let lib = library(&[("c1", "l1", 0)]);
        let snap = snapshot_with_learned(LessonKey::new("c1", "l1"), &[0, 1, 2]);

        let queue = build(QueueMode::Learned, &snap, &[], &lib).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].key.index, 0);
    }

    #[test]
    fn unresolvable_learned_set_yields_empty_queue_not_daily_picks() {
        // Step 5 was learned but its content is gone; lesson content at
        // index 0 exists and would be a daily-pick candidate. The learner's
        // non-empty learned set must suppress the fallback.
        let lib = library(&[("c1", "l1", 0)]);
        let snap = snapshot_with_learned(LessonKey::new("c1", "l1"), &[5]);

        let queue = build(QueueMode::Learned, &snap, &[], &lib).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_learned_set_falls_back_to_daily_picks() {
        let lib = library(&[
            ("c1", "l1", 0),
            ("c1", "l1", 1),
            ("c1", "l1", 2),
        ]);
        // The lesson is known (started) but nothing is learned.
        let mut snap = ProgressSnapshot::default();
        snap.started_lessons
            .insert("c1".into(), BTreeSet::from(["l1".to_string()]));

        let queue = build(QueueMode::Learned, &snap, &[], &lib).unwrap();
        assert!(!queue.is_empty());
        assert!(queue.len() <= DAILY_PICKS);
    }

    #[test]
    fn daily_picks_are_stable_for_a_given_seed() {
        let lib = library(&[
            ("c1", "l1", 0),
            ("c1", "l1", 1),
            ("c1", "l1", 2),
            ("c1", "l1", 3),
            ("c1", "l1", 4),
            ("c1", "l1", 5),
            ("c1", "l1", 6),
        ]);
        let mut snap = ProgressSnapshot::default();
        snap.started_lessons
            .insert("c1".into(), BTreeSet::from(["l1".to_string()]));

        let a = daily_picks(&snap, &lib, 42);
        let b = daily_picks(&snap, &lib, 42);
        assert_eq!(keys(&a), keys(&b));
        assert_eq!(a.len(), DAILY_PICKS);
    }

    // --- current-lesson probe ---

    #[test]
    fn probe_stops_before_a_wide_gap() {
        // Content at 0–5 and 40, hint 10: the 34-wide gap exceeds the 8-miss
        // tolerance, so the scan must stop well before 40.
        let steps: Vec<(&str, &str, u32)> = (0..=5)
            .map(|i| ("c1", "l1", i))
            .chain(std::iter::once(("c1", "l1", 40)))
            .collect();
        let lib = library(&steps);

        let mut snap = ProgressSnapshot::default();
        snap.last_active_course = Some("c1".into());
        snap.last_active_lesson.insert("c1".into(), "l1".into());
        snap.last_step_index.insert(LessonKey::new("c1", "l1"), 10);

        let queue = build(QueueMode::CurrentLesson, &snap, &[], &lib).unwrap();
        let indices: Vec<u32> = queue.iter().map(|i| i.key.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn probe_tolerates_small_gaps() {
        // Gap of exactly 8 between 0 and 9 — still inside tolerance.
        let lib = library(&[("c1", "l1", 0), ("c1", "l1", 9), ("c1", "l1", 10)]);
        let mut snap = ProgressSnapshot::default();
        snap.last_active_course = Some("c1".into());
        snap.last_active_lesson.insert("c1".into(), "l1".into());

        let queue = build(QueueMode::CurrentLesson, &snap, &[], &lib).unwrap();
        let indices: Vec<u32> = queue.iter().map(|i| i.key.index).collect();
        assert_eq!(indices, vec![0, 9, 10]);
    }

    #[test]
    fn probe_finds_lesson_starting_with_a_gap() {
        // Content begins at index 4; the pre-hit bound (>= 32) covers it.
        let lib = library(&[("c1", "l1", 4), ("c1", "l1", 5)]);
        let mut snap = ProgressSnapshot::default();
        snap.last_active_course = Some("c1".into());
        snap.last_active_lesson.insert("c1".into(), "l1".into());

        let queue = build(QueueMode::CurrentLesson, &snap, &[], &lib).unwrap();
        let indices: Vec<u32> = queue.iter().map(|i| i.key.index).collect();
        assert_eq!(indices, vec![4, 5]);
    }

    #[test]
    fn probe_gives_up_at_pre_hit_bound() {
        // No content at all: the scan must terminate empty, not hang.
        let lib = library(&[]);
        let mut snap = ProgressSnapshot::default();
        snap.last_active_course = Some("c1".into());
        snap.last_active_lesson.insert("c1".into(), "l1".into());
        snap.last_step_index
            .insert(LessonKey::new("c1", "l1"), 500); // hint beyond the ceiling

        let queue = build(QueueMode::CurrentLesson, &snap, &[], &lib).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn current_lesson_without_candidates_is_an_error() {
        let lib = library(&[("c1", "l1", 0)]);
        let snap = ProgressSnapshot::default();
        assert_eq!(
            build(QueueMode::CurrentLesson, &snap, &[], &lib).unwrap_err(),
            QueueError::NoActiveLesson
        );
    }

    // --- favorites ---

    #[test]
    fn favorites_mode_skips_malformed_and_unresolvable_refs() {
        let lib = library(&[("c1", "l1", 0), ("c1", "l1", 3)]);
        let favorites = vec![
            "step:c1:l1:idx3".to_string(),
            "step:c1:l1:idx99".to_string(), // no content
            "garbage".to_string(),
            "step:c1:l1:idx0:extra:segments".to_string(),
        ];
        let snap = ProgressSnapshot::default();

        let queue = build(QueueMode::Favorites, &snap, &favorites, &lib).unwrap();
        let indices: Vec<u32> = queue.iter().map(|i| i.key.index).collect();
        assert_eq!(indices, vec![0, 3]);
    }

    // --- dedup & random ---

    #[test]
    fn queue_never_contains_duplicate_keys() {
        let lib = library(&[("c1", "l1", 0)]);
        let favorites = vec![
            "step:c1:l1:idx0".to_string(),
            "step:c1:l1:idx0".to_string(),
            "step:c1:l1:idx0:dup".to_string(),
        ];
        let snap = ProgressSnapshot::default();

        let queue = build(QueueMode::Favorites, &snap, &favorites, &lib).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn random_mode_is_a_permutation_of_the_learned_pool() {
        let steps: Vec<(&str, &str, u32)> = (0..10).map(|i| ("c1", "l1", i)).collect();
        let lib = library(&steps);
        let snap = snapshot_with_learned(
            LessonKey::new("c1", "l1"),
            &(0..10).collect::<Vec<_>>(),
        );

        let base = build(QueueMode::Learned, &snap, &[], &lib).unwrap();
        let random = build(QueueMode::Random, &snap, &[], &lib).unwrap();

        let mut base_keys = keys(&base);
        let mut random_keys = keys(&random);
        assert_eq!(random_keys.len(), 10);
        base_keys.sort();
        random_keys.sort();
        assert_eq!(base_keys, random_keys);
    }
}
