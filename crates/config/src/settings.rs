// Application settings
// Loaded from ~/.config/waterbill/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::prefs::JsonFileBackend;

/// Subfolder of the downloads directory that receives manual backups
pub const BACKUP_SUBDIR: &str = "Backup";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Storage
    #[serde(rename = "storage.path", skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>, // None = <config_dir>/waterbill/water_billing.json

    // Backups
    #[serde(rename = "backup.directory", skip_serializing_if = "Option::is_none")]
    pub backup_directory: Option<PathBuf>, // None = platform downloads dir
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::config_dir().join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::error!("Error parsing settings.json: {}", e);
                        log::warn!("Using default settings");
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::error!("Error reading settings.json: {}", e);
                Self::default()
            }
        }
    }

    /// Where the preferences mapping lives
    pub fn preferences_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(JsonFileBackend::default_path)
    }

    /// Public downloads-like directory for automatic exports
    pub fn downloads_dir(&self) -> PathBuf {
        self.backup_directory
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("Downloads"))
    }
}
