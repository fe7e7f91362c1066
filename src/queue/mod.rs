//! Practice-queue assembly.
//!
//! The queue builder materializes an ordered, deduplicated list of
//! [`crate::content::PracticeItem`]s from one of several sources: the
//! learner's learned steps (with a daily-picks fallback), the current lesson
//! via a bounded probe, the favorites list, or a shuffled view of the base
//! pool.

mod builder;

pub use builder::{build, QueueError, DAILY_PICKS, PROBE_CEILING, PROBE_MISS_TOLERANCE};

use serde::{Deserialize, Serialize};

/// Which source the queue is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueMode {
    /// All previously learned steps; falls back to daily picks when the
    /// learner has not learned anything yet. The default global pool.
    Learned,
    /// The steps of the currently active lesson.
    CurrentLesson,
    /// The learner's favorited steps.
    Favorites,
    /// The learned pool in shuffled order.
    Random,
}

impl Default for QueueMode {
    fn default() -> Self {
        QueueMode::Learned
    }
}

impl QueueMode {
    /// A short human-readable label for status output.
    pub fn label(&self) -> &'static str {
        match self {
            QueueMode::Learned => "learned",
            QueueMode::CurrentLesson => "lesson",
            QueueMode::Favorites => "favorites",
            QueueMode::Random => "random",
        }
    }
}
