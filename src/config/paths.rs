//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + learner data):
//!   Windows: %APPDATA%\thai-practice\
//!   macOS:   ~/Library/Application Support/thai-practice/
//!   Linux:   ~/.config/thai-practice/
//!
//! Data dir (attempt audio):
//!   Windows: %LOCALAPPDATA%\thai-practice\
//!   macOS:   ~/Library/Application Support/thai-practice/
//!   Linux:   ~/.local/share/thai-practice/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and the JSON data files.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Persisted attempt results (`attempts.json`).
    pub attempts_file: PathBuf,
    /// Lesson content library (`lessons.json`).
    pub lessons_file: PathBuf,
    /// Learner progress snapshot (`progress.json`) — written by the host app.
    pub progress_file: PathBuf,
    /// Favorites reference list (`favorites.json`) — written by the host app.
    pub favorites_file: PathBuf,
    /// Fixed capture location for the in-flight attempt (`attempt.wav`).
    pub capture_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "thai-practice";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            attempts_file: config_dir.join("attempts.json"),
            lessons_file: config_dir.join("lessons.json"),
            progress_file: config_dir.join("progress.json"),
            favorites_file: config_dir.join("favorites.json"),
            capture_file: data_dir.join("attempt.wav"),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
