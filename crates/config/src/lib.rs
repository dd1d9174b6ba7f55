// Configuration loading and the persisted preferences mapping

pub mod prefs;
pub mod settings;

use std::fmt;
use std::path::PathBuf;

pub use prefs::{JsonFileBackend, MemoryBackend, Preferences, PreferencesBackend};
pub use settings::Settings;

/// Directory name under the platform config dir
pub const APP_DIR: &str = "waterbill";

/// `<config_dir>/waterbill`, or `./waterbill` when the platform has none
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[derive(Debug)]
pub enum ConfigError {
    /// Reading or writing a file failed.
    Io(String),
    /// JSON (de)serialization failed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
