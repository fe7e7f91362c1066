//! Thai pronunciation practice engine.
//!
//! Drives a record → recognize → score loop over a queue of lesson phrases:
//!
//! ```text
//! progress + favorites ─▶ queue builder ─▶ [PracticeItem, ...]
//!                                               │
//!                              ┌────────────────┘
//!                              ▼
//!            microphone ─▶ recorder (WAV) ─▶ recognizer (locale-aware STT)
//!                                               │
//!                                               ▼
//!                     scorer (normalized edit distance, 0–100)
//!                                               │
//!                                               ▼
//!                     attempt store (last result per step, durable)
//! ```
//!
//! The [`session::PracticeEngine`] owns the state machine and serializes all
//! transitions through one command loop; everything it collaborates with —
//! recorder, recognizer, content lookup — is an injected capability, so the
//! engine is fully testable with mocks.

pub mod config;
pub mod content;
pub mod progress;
pub mod queue;
pub mod recognize;
pub mod recorder;
pub mod scoring;
pub mod session;
pub mod store;
