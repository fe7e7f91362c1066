//! Session phase state machine and the shared view-model.
//!
//! [`SessionPhase`] drives the practice state machine. The presentation
//! layer reads it through [`SharedView`] to render the appropriate screen.
//!
//! [`SessionView`] is the single source of truth for everything the
//! presentation layer needs: phase, current item, queue window, heard-text
//! fields, attempt count, live meter, and the current hint.
//!
//! [`SharedView`] is a type alias for `Arc<Mutex<SessionView>>` — cheap to
//! clone and safe to share across threads.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::content::PracticeItem;
use crate::queue::QueueMode;

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Phase of one practice attempt. Exactly one phase is active at a time.
///
/// ```text
/// Idle / Hint / Feedback ──startAttempt──▶ Recording
/// Recording ──stopAndAnalyze──▶ Analyzing   (audio captured)
///           ──stopAndAnalyze──▶ Hint        (no audio artifact)
/// Analyzing ──recognized──▶ Feedback(score, hint)
///           ──empty / failed──▶ Hint
/// any ──select / next / prev──▶ Idle, or Hint with a restored result
/// any ──repeat──▶ Idle
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the learner to start an attempt.
    Idle,

    /// Microphone is active; audio is being captured to the attempt file.
    Recording,

    /// Audio finalized; the recognition task is running off-context.
    Analyzing,

    /// A guidance message is showing — failures, empty states, and restored
    /// prior results all land here. Always recoverable by recording again.
    Hint,

    /// A fresh attempt has been scored.
    Feedback {
        /// Similarity score in `[0, 100]`.
        score: u8,
        /// Coaching message for the score's tier.
        hint: String,
    },
}

impl SessionPhase {
    /// Returns `true` while an attempt is actively capturing or analyzing.
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionPhase::Recording | SessionPhase::Analyzing)
    }

    /// A short label for status output.
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Recording => "Recording",
            SessionPhase::Analyzing => "Analyzing",
            SessionPhase::Hint => "Hint",
            SessionPhase::Feedback { .. } => "Feedback",
        }
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

// ---------------------------------------------------------------------------
// SessionView
// ---------------------------------------------------------------------------

/// Shared presentation state — everything the (out-of-scope) rendering
/// layer needs. The engine mutates it; readers poll it.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    /// Current phase of the practice state machine.
    pub phase: SessionPhase,

    /// Active queue mode.
    pub mode: QueueMode,

    /// The item currently being practiced, if the queue is non-empty.
    pub current: Option<PracticeItem>,

    /// Position of the current item within the queue.
    pub position: usize,

    /// Total queue length.
    pub queue_len: usize,

    /// Recognized transcript of the presented attempt.
    pub heard_text: Option<String>,

    /// Transliteration of the recognized transcript, when available.
    pub heard_translit: Option<String>,

    /// Score of the presented attempt (fresh or restored).
    pub score: Option<u8>,

    /// Pass/fail verdict against the configured match threshold.
    pub last_match: Option<bool>,

    /// Accumulated attempt count for the current item.
    pub attempt_count: u32,

    /// Audio artifact of the last attempt, for replay.
    pub last_audio: Option<PathBuf>,

    /// Guidance message shown in `Hint` (and alongside `Feedback`).
    pub hint: Option<String>,

    /// Live input level in `[0, 1]`; non-zero only while recording.
    pub input_level: f32,

    /// Live partial transcript; empty when unavailable.
    pub partial_transcript: String,
}

// ---------------------------------------------------------------------------
// SharedView
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SessionView`].
///
/// Cheap to clone (`Arc` clone). Lock for a short critical section; never
/// hold the lock across `.await` points.
pub type SharedView = Arc<Mutex<SessionView>>;

/// Construct a new [`SharedView`] wrapping a default [`SessionView`].
pub fn new_shared_view() -> SharedView {
    Arc::new(Mutex::new(SessionView::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
