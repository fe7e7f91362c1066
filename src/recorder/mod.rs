//! Microphone recording to a well-known capture file.
//!
//! [`Recorder`] is the capability the session engine drives: start/stop are
//! explicit two-phase async operations that resolve to an audio handle or
//! `None` — they never panic and never raise for the expected failures
//! (permission denied, device busy, empty artifact). While capturing, the
//! recorder publishes a normalized input level and a best-effort live
//! partial transcript for the presentation layer to mirror.
//!
//! [`WavRecorder`] is the production implementation (cpal capture thread →
//! WAV file via hound).

pub mod wav;

use std::path::PathBuf;

use async_trait::async_trait;

pub use wav::WavRecorder;

// ---------------------------------------------------------------------------
// RecorderState
// ---------------------------------------------------------------------------

/// Recorder-private lifecycle state.
///
/// ```text
/// Idle → RequestingPermission → Starting → Recording → Stopping → Idle
/// ```
///
/// The error deadends (`PermissionDenied`, `StartFailed`, `StopFailed`) are
/// always recoverable by calling `start()` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    RequestingPermission,
    Starting,
    Recording,
    Stopping,
    PermissionDenied,
    StartFailed,
    StopFailed,
}

impl Default for RecorderState {
    fn default() -> Self {
        RecorderState::Idle
    }
}

// ---------------------------------------------------------------------------
// Recorder trait
// ---------------------------------------------------------------------------

/// Object-safe interface for microphone recorders.
///
/// `Send` so the session engine (a spawned task) can own one.
#[async_trait]
pub trait Recorder: Send {
    /// Ask for microphone access. Must precede the first capture.
    async fn request_permission(&mut self) -> bool;

    /// Begin capturing to the fixed capture file, overwriting any prior
    /// attempt. Returns the audio handle, or `None` on failure (permission
    /// denied, device busy) — callers branch on `None`, nothing is raised.
    ///
    /// Any previous in-flight attempt is stopped and discarded first.
    async fn start(&mut self) -> Option<PathBuf>;

    /// Stop capturing. Idempotent: stopping while not recording is a no-op
    /// that reports failure (`None`). Returns the handle only when a
    /// non-empty audio artifact exists on disk.
    async fn stop(&mut self) -> Option<PathBuf>;

    /// Existence + non-zero-payload check against the fixed capture path.
    fn current_audio(&self) -> Option<PathBuf>;

    /// Normalized input level in `[0, 1]`, refreshed while recording.
    fn input_level(&self) -> f32;

    /// Best-effort live partial transcript; empty when unavailable.
    fn partial_transcript(&self) -> String;

    /// Current lifecycle state.
    fn state(&self) -> RecorderState;
}

// Compile-time assertion: Box<dyn Recorder> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Recorder>) {}
};

// ---------------------------------------------------------------------------
// MockRecorder  (test-only)
// ---------------------------------------------------------------------------

/// Test double with scripted start/stop outcomes.
#[cfg(test)]
pub struct MockRecorder {
    /// Whether `start()` succeeds.
    pub start_ok: bool,
    /// Artifact path `stop()` reports, or `None` for "no audio captured".
    pub stop_artifact: Option<PathBuf>,
    /// Scripted level while recording.
    pub level: f32,
    state: RecorderState,
}

#[cfg(test)]
impl MockRecorder {
    pub fn new(start_ok: bool, stop_artifact: Option<PathBuf>) -> Self {
        Self {
            start_ok,
            stop_artifact,
            level: 0.5,
            state: RecorderState::Idle,
        }
    }

    /// A recorder whose attempts always succeed with the given artifact.
    pub fn working(artifact: PathBuf) -> Self {
        Self::new(true, Some(artifact))
    }
}

#[cfg(test)]
#[async_trait]
impl Recorder for MockRecorder {
    async fn request_permission(&mut self) -> bool {
        self.start_ok
    }

    async fn start(&mut self) -> Option<PathBuf> {
        if self.start_ok {
            self.state = RecorderState::Recording;
            // The handle points at the fixed capture path; whether a usable
            // artifact exists is only known at stop time.
            Some(
                self.stop_artifact
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("/mock/attempt.wav")),
            )
        } else {
            self.state = RecorderState::StartFailed;
            None
        }
    }

    async fn stop(&mut self) -> Option<PathBuf> {
        if self.state != RecorderState::Recording {
            return None;
        }
        self.state = RecorderState::Idle;
        self.stop_artifact.clone()
    }

    fn current_audio(&self) -> Option<PathBuf> {
        self.stop_artifact.clone()
    }

    fn input_level(&self) -> f32 {
        if self.state == RecorderState::Recording {
            self.level
        } else {
            0.0
        }
    }

    fn partial_transcript(&self) -> String {
        String::new()
    }

    fn state(&self) -> RecorderState {
        self.state
    }
}
