//! Configuration — settings structs, TOML persistence, platform paths.

mod paths;
mod settings;

pub use paths::AppPaths;
pub use settings::{PracticeConfig, QueueConfig, RecorderConfig, ScoringConfig};
