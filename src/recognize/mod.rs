//! Speech recognition capability.
//!
//! The engine treats recognition as an opaque, injected capability: given a
//! finalized audio file and a target locale it asynchronously produces a
//! transcript or fails. Authorization is its own asynchronous step and must
//! precede the first recognition call.
//!
//! The engine performs **zero** automatic retries — the first failure is
//! surfaced as a hint and the learner retries explicitly.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// RecognizeError
// ---------------------------------------------------------------------------

/// All errors the recognition capability can report.
#[derive(Debug, Clone, Error)]
pub enum RecognizeError {
    /// The user has not granted speech-recognition access.
    #[error("speech recognition is not authorized")]
    NotAuthorized,

    /// No recognition backend is available on this device.
    #[error("speech recognition is unavailable: {0}")]
    Unavailable(String),

    /// The backend accepted the audio but failed to produce a transcript.
    #[error("recognition failed: {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// SpeechRecognizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to a speech-recognition backend.
///
/// Implementations must be `Send + Sync` so they can be held behind an
/// `Arc<dyn SpeechRecognizer>` and called from the spawned analysis task.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Request recognition authorization. Must be called (and return `true`)
    /// before the first [`recognize`](Self::recognize) call.
    async fn request_authorization(&self) -> bool;

    /// Transcribe the audio file at `audio` for the given BCP-47 `locale`.
    async fn recognize(&self, audio: &Path, locale: &str) -> Result<String, RecognizeError>;
}

// Compile-time assertion: Box<dyn SpeechRecognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechRecognizer>) {}
};

// ---------------------------------------------------------------------------
// UnavailableRecognizer
// ---------------------------------------------------------------------------

/// Stand-in used when no recognition backend is wired up.
///
/// Every call fails with [`RecognizeError::Unavailable`], which the session
/// engine converts into its "scoring unavailable" hint — the app keeps
/// working (record + replay) without a backend.
pub struct UnavailableRecognizer;

#[async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    async fn request_authorization(&self) -> bool {
        false
    }

    async fn recognize(&self, _audio: &Path, _locale: &str) -> Result<String, RecognizeError> {
        Err(RecognizeError::Unavailable(
            "no speech recognition backend configured".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// Test double that returns a pre-configured response.
#[cfg(test)]
pub struct MockRecognizer {
    authorized: bool,
    response: Result<String, RecognizeError>,
}

#[cfg(test)]
impl MockRecognizer {
    /// Create an authorized mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            authorized: true,
            response: Ok(text.into()),
        }
    }

    /// Create an authorized mock that always returns `Err(error)`.
    pub fn err(error: RecognizeError) -> Self {
        Self {
            authorized: true,
            response: Err(error),
        }
    }

    /// Create a mock whose authorization request is refused. `recognize`
    /// still answers `Ok(text)`, so a caller that skips the authorization
    /// step shows up as a scored result instead of a refusal.
    pub fn unauthorized(text: impl Into<String>) -> Self {
        Self {
            authorized: false,
            response: Ok(text.into()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn request_authorization(&self) -> bool {
        self.authorized
    }

    async fn recognize(&self, _audio: &Path, _locale: &str) -> Result<String, RecognizeError> {
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_recognizer_always_fails() {
        let recognizer = UnavailableRecognizer;
        assert!(!recognizer.request_authorization().await);
        let err = recognizer
            .recognize(Path::new("/tmp/x.wav"), "th-TH")
            .await
            .unwrap_err();
        assert!(matches!(err, RecognizeError::Unavailable(_)));
    }

    #[tokio::test]
    async fn mock_returns_configured_transcript() {
        let recognizer = MockRecognizer::ok("สวัสดี");
        let text = recognizer
            .recognize(Path::new("/tmp/x.wav"), "th-TH")
            .await
            .unwrap();
        assert_eq!(text, "สวัสดี");
    }

    #[test]
    fn box_dyn_recognizer_compiles() {
        // If this test compiles, the trait is object-safe.
        let _: Box<dyn SpeechRecognizer> = Box::new(UnavailableRecognizer);
    }

    #[test]
    fn error_display_is_specific() {
        let e = RecognizeError::Unavailable("no backend".into());
        assert!(e.to_string().contains("no backend"));
        assert!(RecognizeError::NotAuthorized.to_string().contains("authorized"));
    }
}
