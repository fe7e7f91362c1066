//! Practice session — the state machine and the engine that drives it.
//!
//! The engine is the only writer of session state; the presentation layer
//! reads through [`SharedView`] and sends [`SessionCommand`]s back.

mod engine;
mod state;

pub use engine::{PracticeEngine, SessionCommand};
pub use state::{new_shared_view, SessionPhase, SessionView, SharedView};
