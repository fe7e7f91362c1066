//! Practice session engine — owns the phase state machine and coordinates
//! recorder, recognizer, scorer, queue builder and attempt store.
//!
//! [`PracticeEngine`] responds to [`SessionCommand`]s received over a
//! `tokio::sync::mpsc` channel; all phase transitions are serialized through
//! this one loop, so nothing else ever mutates the phase or the queue.
//!
//! # Attempt flow
//!
//! ```text
//! StartAttempt
//!   └─▶ recorder.start() ── Some ─▶ Recording (meter poll active)
//!                         ── None ─▶ Hint "check microphone access"
//!
//! StopAndAnalyze
//!   └─▶ recorder.stop() ── None ─▶ Hint "no audio captured"
//!                        ── Some ─▶ Analyzing, spawn recognition task
//!         └─▶ transcript ── text  ─▶ score + persist ─▶ Feedback(score, hint)
//!                         ── empty ─▶ Hint "nothing usable"
//!                         ── error ─▶ Hint "scoring unavailable"
//! ```
//!
//! Recognition is the only work that runs off this loop. Its completion is
//! keyed to the item it started with: the store entry for that key is always
//! written, but the presented view is only updated when the learner has not
//! navigated away in the meantime.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::PracticeConfig;
use crate::content::{ContentLookup, ItemKey, PracticeItem};
use crate::progress::ProgressSnapshot;
use crate::queue::{self, QueueError, QueueMode};
use crate::recognize::{RecognizeError, SpeechRecognizer};
use crate::recorder::Recorder;
use crate::scoring::{self, FeedbackTier};
use crate::store::{AttemptResult, AttemptStore};

use super::state::{SessionPhase, SharedView};

// ---------------------------------------------------------------------------
// Hint messages
// ---------------------------------------------------------------------------

/// Shown when the queue resolved to nothing.
pub const HINT_QUEUE_EMPTY: &str =
    "Nothing to practice yet — learn a few steps or add favorites first";

/// Shown when current-lesson mode finds no active lesson.
pub const HINT_NO_ACTIVE_LESSON: &str =
    "No active lesson — open a lesson in the course first";

/// Shown when the recorder refuses to start.
pub const HINT_MIC_UNAVAILABLE: &str =
    "Couldn't start recording — check microphone access";

/// Shown when stopping produced no audio artifact.
pub const HINT_NO_AUDIO: &str =
    "The recording didn't capture any audio — try again";

/// Shown when recognition succeeded but returned nothing usable.
pub const HINT_EMPTY_TRANSCRIPT: &str =
    "Recognition returned nothing usable — speak a little louder and closer";

/// Shown when recognition is unavailable; the attempt stays replayable.
pub const HINT_RECOGNITION_FAILED: &str =
    "Scoring unavailable — no speech recognition access; your recording is kept for replay";

// ---------------------------------------------------------------------------
// SessionCommand
// ---------------------------------------------------------------------------

/// User actions driving the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Begin a recording attempt for the current item.
    StartAttempt,
    /// Finish the recording and analyze it.
    StopAndAnalyze,
    /// Jump to the queue item at this position.
    Select(usize),
    /// Advance to the next item (wraps).
    Next,
    /// Go back to the previous item (wraps).
    Prev,
    /// Clear the presented attempt state and try the current item again.
    Repeat,
    /// Switch queue source and rebuild the queue.
    SetMode(QueueMode),
}

// ---------------------------------------------------------------------------
// AnalysisOutcome  (internal)
// ---------------------------------------------------------------------------

/// Completion message from a spawned recognition task, keyed to the item the
/// attempt was recorded for.
struct AnalysisOutcome {
    item: PracticeItem,
    transcript: Result<String, RecognizeError>,
    audio_path: PathBuf,
    attempt_count: u32,
}

// ---------------------------------------------------------------------------
// PracticeEngine
// ---------------------------------------------------------------------------

/// Drives a pronunciation practice session.
///
/// Create with [`PracticeEngine::new`], hand the [`SharedView`] to the
/// presentation layer, then call [`run`](Self::run) inside a tokio task.
/// All collaborators are injected — the engine holds no globals.
pub struct PracticeEngine {
    view: SharedView,
    config: PracticeConfig,
    phase: SessionPhase,
    mode: QueueMode,
    queue: Vec<PracticeItem>,
    position: usize,
    /// Per-key attempt counters, seeded from the store on first visit.
    attempt_counts: HashMap<ItemKey, u32>,
    /// Recognition tasks still in flight (drained at shutdown).
    inflight: usize,
    analysis_tx: Option<mpsc::Sender<AnalysisOutcome>>,
    /// Whether recognition authorization has been granted. Requested lazily
    /// before the first recognition; a refusal is re-requested on the next
    /// attempt so a later grant is picked up.
    recognizer_authorized: bool,

    recorder: Box<dyn Recorder>,
    recognizer: Arc<dyn SpeechRecognizer>,
    store: AttemptStore,
    content: Arc<dyn ContentLookup>,
    snapshot: ProgressSnapshot,
    favorites: Vec<String>,
}

impl PracticeEngine {
    /// Create a new engine.
    ///
    /// # Arguments
    ///
    /// * `recorder`   — microphone capture (e.g. `WavRecorder`).
    /// * `recognizer` — speech-to-text capability.
    /// * `store`      — durable per-step attempt results.
    /// * `content`    — lesson content lookup.
    /// * `snapshot`   — read-only learner progress.
    /// * `favorites`  — raw favorites reference list.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recorder: Box<dyn Recorder>,
        recognizer: Arc<dyn SpeechRecognizer>,
        store: AttemptStore,
        content: Arc<dyn ContentLookup>,
        snapshot: ProgressSnapshot,
        favorites: Vec<String>,
        config: PracticeConfig,
    ) -> Self {
        let mode = config.queue.default_mode;
        Self {
            view: super::state::new_shared_view(),
            config,
            phase: SessionPhase::Idle,
            mode,
            queue: Vec::new(),
            position: 0,
            attempt_counts: HashMap::new(),
            inflight: 0,
            analysis_tx: None,
            recognizer_authorized: false,
            recorder,
            recognizer,
            store,
            content,
            snapshot,
            favorites,
        }
    }

    /// Handle the presentation layer polls for state.
    pub fn shared_view(&self) -> SharedView {
        Arc::clone(&self.view)
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Run the engine until `commands` is closed.
    ///
    /// Builds the initial queue, then serializes every phase transition
    /// through one `select!` loop: commands, recognition completions, and —
    /// only while `Recording` — the meter/partial-transcript poll. In-flight
    /// recognitions are drained before returning so their results are
    /// persisted.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let (tx, mut analysis_rx) = mpsc::channel::<AnalysisOutcome>(16);
        self.analysis_tx = Some(tx);

        self.rebuild_queue();

        let mut meter = tokio::time::interval(Duration::from_millis(
            self.config.recorder.meter_interval_ms.max(1),
        ));
        meter.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
                Some(outcome) = analysis_rx.recv() => self.apply_outcome(outcome),
                _ = meter.tick(), if self.phase == SessionPhase::Recording => {
                    self.poll_meter();
                }
            }
        }

        // Drop our sender so the channel closes once the tasks finish.
        self.analysis_tx = None;
        while self.inflight > 0 {
            match analysis_rx.recv().await {
                Some(outcome) => self.apply_outcome(outcome),
                None => break,
            }
        }

        log::info!("session: command channel closed, engine shutting down");
    }

    async fn handle(&mut self, command: SessionCommand) {
        log::debug!("session: {command:?} (phase {})", self.phase.label());
        match command {
            SessionCommand::StartAttempt => self.start_attempt().await,
            SessionCommand::StopAndAnalyze => self.stop_and_analyze().await,
            SessionCommand::Select(index) => self.select(index).await,
            SessionCommand::Next => self.step(1).await,
            SessionCommand::Prev => self.step(-1).await,
            SessionCommand::Repeat => self.repeat().await,
            SessionCommand::SetMode(mode) => self.set_mode(mode).await,
        }
    }

    // -----------------------------------------------------------------------
    // Queue lifecycle
    // -----------------------------------------------------------------------

    fn rebuild_queue(&mut self) {
        self.view.lock().unwrap().mode = self.mode;

        match queue::build(self.mode, &self.snapshot, &self.favorites, &*self.content) {
            Ok(items) if items.is_empty() => {
                self.queue.clear();
                self.position = 0;
                self.clear_item_view();
                self.set_hint(HINT_QUEUE_EMPTY);
            }
            Ok(items) => {
                self.queue = items;
                self.position = 0;
                self.restore_current();
            }
            Err(QueueError::NoActiveLesson) => {
                self.queue.clear();
                self.position = 0;
                self.clear_item_view();
                self.set_hint(HINT_NO_ACTIVE_LESSON);
            }
        }
    }

    /// Re-enter the current item: restore its persisted result verbatim when
    /// one exists (phase `Hint`), else reset to `Idle`.
    fn restore_current(&mut self) {
        let Some(item) = self.queue.get(self.position).cloned() else {
            return;
        };

        let prior = self.store.load(&item.key).cloned();
        let count = *self
            .attempt_counts
            .entry(item.key.clone())
            .or_insert_with(|| prior.as_ref().map(|r| r.attempt_count).unwrap_or(0));

        let threshold = self.config.scoring.match_threshold;
        {
            let mut view = self.view.lock().unwrap();
            view.current = Some(item);
            view.position = self.position;
            view.queue_len = self.queue.len();
            view.attempt_count = count;
            match &prior {
                Some(r) => {
                    view.heard_text = r.heard_text.clone();
                    view.heard_translit = r.heard_translit.clone();
                    view.score = Some(r.confidence_score);
                    view.last_match = Some(scoring::is_match(r.confidence_score, threshold));
                    view.last_audio = r.last_attempt_audio_path.clone().map(PathBuf::from);
                    view.hint =
                        Some(FeedbackTier::for_score(r.confidence_score).hint().to_string());
                }
                None => {
                    view.heard_text = None;
                    view.heard_translit = None;
                    view.score = None;
                    view.last_match = None;
                    view.last_audio = None;
                    view.hint = None;
                }
            }
        }

        self.set_phase(if prior.is_some() {
            SessionPhase::Hint
        } else {
            SessionPhase::Idle
        });
    }

    fn clear_item_view(&mut self) {
        let mut view = self.view.lock().unwrap();
        view.current = None;
        view.position = 0;
        view.queue_len = 0;
        view.attempt_count = 0;
        view.heard_text = None;
        view.heard_translit = None;
        view.score = None;
        view.last_match = None;
        view.last_audio = None;
    }

    // -----------------------------------------------------------------------
    // Attempt lifecycle
    // -----------------------------------------------------------------------

    /// `Idle | Hint | Feedback → Recording`, or `Hint` when the recorder
    /// cannot start. Ignored while `Recording` or `Analyzing`: an attempt in
    /// flight cannot be raced by a new capture.
    async fn start_attempt(&mut self) {
        if self.phase.is_busy() {
            log::debug!("session: start ignored while {}", self.phase.label());
            return;
        }
        if self.queue.get(self.position).is_none() {
            self.set_hint(HINT_QUEUE_EMPTY);
            return;
        }

        {
            let mut view = self.view.lock().unwrap();
            view.heard_text = None;
            view.heard_translit = None;
            view.score = None;
            view.last_match = None;
            view.last_audio = None;
            view.hint = None;
        }

        match self.recorder.start().await {
            Some(_) => self.set_phase(SessionPhase::Recording),
            None => {
                // Visible failure, not a silent return to Idle.
                self.set_hint(HINT_MIC_UNAVAILABLE);
            }
        }
    }

    /// `Recording → Analyzing` when audio was captured, else straight to
    /// `Hint` with the attempt counter untouched.
    async fn stop_and_analyze(&mut self) {
        if self.phase != SessionPhase::Recording {
            log::debug!("session: stop ignored outside Recording");
            return;
        }
        let Some(item) = self.queue.get(self.position).cloned() else {
            self.set_hint(HINT_QUEUE_EMPTY);
            return;
        };

        let Some(audio_path) = self.recorder.stop().await else {
            self.set_hint(HINT_NO_AUDIO);
            return;
        };

        let count = self.attempt_counts.entry(item.key.clone()).or_insert(0);
        *count += 1;
        let attempt_count = *count;

        {
            let mut view = self.view.lock().unwrap();
            view.attempt_count = attempt_count;
            view.last_audio = Some(audio_path.clone());
        }

        // Authorization precedes the first recognition. A refusal keeps the
        // recording replayable and never reaches the backend.
        if !self.recognizer_authorized {
            self.recognizer_authorized = self.recognizer.request_authorization().await;
            if !self.recognizer_authorized {
                log::warn!("session: speech recognition authorization denied");
                self.set_hint(HINT_RECOGNITION_FAILED);
                return;
            }
        }

        self.set_phase(SessionPhase::Analyzing);

        let Some(tx) = self.analysis_tx.clone() else {
            log::error!("session: analysis channel missing, engine not running");
            return;
        };

        let recognizer = Arc::clone(&self.recognizer);
        let locale = self.config.locale.clone();
        self.inflight += 1;

        // The one operation that runs off the engine loop. Keyed to the item
        // it started with; completion re-enters through the channel.
        tokio::spawn(async move {
            let transcript = recognizer.recognize(&audio_path, &locale).await;
            let _ = tx
                .send(AnalysisOutcome {
                    item,
                    transcript,
                    audio_path,
                    attempt_count,
                })
                .await;
        });
    }

    /// Apply a recognition completion.
    ///
    /// The persisted store entry for the outcome's own key is written
    /// unconditionally; the presented view only changes when the outcome
    /// still belongs to the current item and the engine is still `Analyzing`.
    fn apply_outcome(&mut self, outcome: AnalysisOutcome) {
        self.inflight = self.inflight.saturating_sub(1);

        let presenting = self.phase == SessionPhase::Analyzing
            && self
                .queue
                .get(self.position)
                .is_some_and(|current| current.key == outcome.item.key);

        match outcome.transcript {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() || outcome.item.phrase.trim().is_empty() {
                    if presenting {
                        self.set_hint(HINT_EMPTY_TRANSCRIPT);
                    } else {
                        log::debug!(
                            "session: discarding empty stale transcript for {}",
                            outcome.item.key
                        );
                    }
                    return;
                }

                let score = scoring::score(&text, &outcome.item.phrase);
                let tier = FeedbackTier::for_score(score);

                self.store.save(AttemptResult {
                    course_id: outcome.item.key.course_id.clone(),
                    lesson_id: outcome.item.key.lesson_id.clone(),
                    step_index: outcome.item.key.index,
                    heard_text: Some(text.clone()),
                    heard_translit: None,
                    confidence_score: score,
                    attempt_count: outcome.attempt_count,
                    last_attempt_audio_path: Some(outcome.audio_path.display().to_string()),
                    timestamp: Utc::now(),
                });

                if presenting {
                    let threshold = self.config.scoring.match_threshold;
                    {
                        let mut view = self.view.lock().unwrap();
                        view.heard_text = Some(text);
                        view.score = Some(score);
                        view.last_match = Some(scoring::is_match(score, threshold));
                        view.hint = Some(tier.hint().to_string());
                    }
                    self.set_phase(SessionPhase::Feedback {
                        score,
                        hint: tier.hint().to_string(),
                    });
                } else {
                    log::debug!(
                        "session: stored stale result for {} (score {score})",
                        outcome.item.key
                    );
                }
            }
            Err(e) => {
                log::warn!("session: recognition failed for {}: {e}", outcome.item.key);
                if presenting {
                    // The audio handle set at stop time stays on the view so
                    // the attempt can be replayed.
                    self.set_hint(HINT_RECOGNITION_FAILED);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Switch to the item at `index`. Switching always snaps out of the
    /// outgoing item's `Recording`/`Analyzing`: a mid-recording switch runs
    /// stop-and-analyze for the outgoing item first.
    async fn select(&mut self, index: usize) {
        if self.phase == SessionPhase::Recording {
            self.stop_and_analyze().await;
        }
        if index >= self.queue.len() {
            log::warn!("session: select {index} out of range (len {})", self.queue.len());
            return;
        }
        self.position = index;
        self.restore_current();
    }

    /// Move to the adjacent item, wrapping at both ends.
    async fn step(&mut self, delta: isize) {
        if self.queue.is_empty() {
            return;
        }
        if self.phase == SessionPhase::Recording {
            self.stop_and_analyze().await;
        }
        let len = self.queue.len() as isize;
        self.position = (self.position as isize + delta).rem_euclid(len) as usize;
        self.restore_current();
    }

    /// Clear the presented attempt state for another try. Only in-memory
    /// fields are touched; the persisted result survives.
    async fn repeat(&mut self) {
        if self.phase == SessionPhase::Recording {
            // Discard the in-flight capture.
            let _ = self.recorder.stop().await;
        }
        {
            let mut view = self.view.lock().unwrap();
            view.heard_text = None;
            view.heard_translit = None;
            view.score = None;
            view.last_match = None;
            view.last_audio = None;
            view.hint = None;
        }
        self.set_phase(SessionPhase::Idle);
    }

    async fn set_mode(&mut self, mode: QueueMode) {
        if self.phase == SessionPhase::Recording {
            let _ = self.recorder.stop().await;
        }
        self.mode = mode;
        self.rebuild_queue();
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_phase(&mut self, phase: SessionPhase) {
        let leaving_recording =
            self.phase == SessionPhase::Recording && phase != SessionPhase::Recording;
        self.phase = phase.clone();

        let mut view = self.view.lock().unwrap();
        if leaving_recording {
            // The meter poll stops with the phase; clear its last snapshot.
            view.input_level = 0.0;
            view.partial_transcript.clear();
        }
        view.phase = phase;
    }

    fn set_hint(&mut self, message: &str) {
        self.view.lock().unwrap().hint = Some(message.to_string());
        self.set_phase(SessionPhase::Hint);
    }

    /// Mirror the recorder's published level and partial transcript into the
    /// view. Only runs while `Recording`.
    fn poll_meter(&mut self) {
        let level = self.recorder.input_level();
        let partial = self.recorder.partial_transcript();
        let mut view = self.view.lock().unwrap();
        view.input_level = level;
        view.partial_transcript = partial;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
