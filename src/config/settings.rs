//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::queue::QueueMode;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ScoringConfig
// ---------------------------------------------------------------------------

/// Settings for the similarity scorer.
///
/// Only the pass/fail verdict threshold is configurable; the feedback-tier
/// bands are fixed constants in `scoring` and the two scales are tuned
/// independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum score (inclusive) counted as a match.
    pub match_threshold: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            match_threshold: crate::scoring::DEFAULT_MATCH_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// RecorderConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and the live meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Interval of the level/partial-transcript poll while recording, in ms.
    pub meter_interval_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            meter_interval_ms: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Settings for queue building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Mode the session starts in.
    pub default_mode: QueueMode,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_mode: QueueMode::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// PracticeConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use thai_practice::config::PracticeConfig;
///
/// // Load (returns Default when file is missing)
/// let config = PracticeConfig::load().unwrap();
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeConfig {
    /// BCP-47 locale passed to the speech recognizer.
    pub locale: String,
    /// Similarity scoring settings.
    pub scoring: ScoringConfig,
    /// Capture / meter settings.
    pub recorder: RecorderConfig,
    /// Queue settings.
    pub queue: QueueConfig,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            locale: "th-TH".into(),
            scoring: ScoringConfig::default(),
            recorder: RecorderConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl PracticeConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(PracticeConfig::default())` when the file does not exist
    /// yet (first-run scenario) so callers never need to special-case a
    /// missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_values() {
        let cfg = PracticeConfig::default();
        assert_eq!(cfg.locale, "th-TH");
        assert_eq!(cfg.scoring.match_threshold, 70);
        assert_eq!(cfg.recorder.meter_interval_ms, 50);
        assert_eq!(cfg.queue.default_mode, QueueMode::Learned);
    }

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut original = PracticeConfig::default();
        original.locale = "th".into();
        original.scoring.match_threshold = 80;
        original.queue.default_mode = QueueMode::Favorites;

        original.save_to(&path).expect("save");
        let loaded = PracticeConfig::load_from(&path).expect("load");

        assert_eq!(loaded.locale, "th");
        assert_eq!(loaded.scoring.match_threshold, 80);
        assert_eq!(loaded.queue.default_mode, QueueMode::Favorites);
        assert_eq!(
            loaded.recorder.meter_interval_ms,
            original.recorder.meter_interval_ms
        );
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = PracticeConfig::load_from(&path).expect("should not error");
        assert_eq!(config.locale, PracticeConfig::default().locale);
    }
}
