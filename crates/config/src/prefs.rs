// Persisted billing preferences
// Stored at ~/.config/waterbill/water_billing.json by default
//
// Keys mirror the durable mapping: excel_data, last_modified,
// autosave_enabled, bill_count, current_filename. Absent keys are omitted.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default file name of the preferences store
pub const PREFERENCES_FILE: &str = "water_billing.json";

/// Number of successful bills per automatic export cycle (counter runs 0..BILL_CYCLE)
pub const BILL_CYCLE: u8 = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Serialized billing sheet (JSON text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excel_data: Option<String>,

    /// Epoch millis of the last qualifying save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub autosave_enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_count: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_filename: Option<String>,
}

impl Preferences {
    /// Autosave defaults to on
    pub fn autosave(&self) -> bool {
        self.autosave_enabled.unwrap_or(true)
    }

    /// Bill-cycle counter, always within 0..BILL_CYCLE
    pub fn bill_count(&self) -> u8 {
        self.bill_count.unwrap_or(0) % BILL_CYCLE
    }

    /// Advance the bill-cycle counter, returning the value before the increment.
    pub fn advance_bill_count(&mut self) -> u8 {
        let before = self.bill_count();
        self.bill_count = Some((before + 1) % BILL_CYCLE);
        before
    }
}

/// Durable home of the preferences mapping
pub trait PreferencesBackend: Send + Sync {
    /// Current mapping. A missing store yields defaults.
    fn load(&self) -> Result<Preferences, ConfigError>;

    /// Replace the whole mapping.
    fn store(&self, prefs: &Preferences) -> Result<(), ConfigError>;
}

/// Pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/waterbill/water_billing.json`
    pub fn default_path() -> PathBuf {
        crate::config_dir().join(PREFERENCES_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferencesBackend for JsonFileBackend {
    fn load(&self) -> Result<Preferences, ConfigError> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| ConfigError::Io(e.to_string()))?;
        match serde_json::from_str(&contents) {
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                log::error!("Error parsing {}: {}", self.path.display(), e);
                log::warn!("Using default preferences");
                Ok(Preferences::default())
            }
        }
    }

    fn store(&self, prefs: &Preferences) -> Result<(), ConfigError> {
        // Ensure directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
            }
        }

        let json =
            serde_json::to_string_pretty(prefs).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// In-process mapping for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryBackend {
    prefs: Mutex<Preferences>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(prefs: Preferences) -> Self {
        Self { prefs: Mutex::new(prefs) }
    }
}

impl PreferencesBackend for MemoryBackend {
    fn load(&self) -> Result<Preferences, ConfigError> {
        Ok(self.prefs.lock().clone())
    }

    fn store(&self, prefs: &Preferences) -> Result<(), ConfigError> {
        *self.prefs.lock() = prefs.clone();
        Ok(())
    }
}
