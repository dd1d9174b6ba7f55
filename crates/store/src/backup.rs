// Backup locations and the export seam used by the autosave policy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use waterbill_config::settings::BACKUP_SUBDIR;
use waterbill_config::Settings;
use waterbill_core::Sheet;
use waterbill_io::CodecError;

/// Prefix of automatic every-5th-bill exports
pub const AUTO_SAVE_PREFIX: &str = "AS_";

/// Writes a sheet to a spreadsheet file
pub trait SheetExporter: Send + Sync {
    fn export(&self, path: &Path, sheet: &Sheet) -> Result<(), CodecError>;
}

/// Exports through the xlsx codec
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxExporter;

impl SheetExporter for XlsxExporter {
    fn export(&self, path: &Path, sheet: &Sheet) -> Result<(), CodecError> {
        waterbill_io::xlsx::write(path, sheet)
    }
}

/// Result of the automatic export attempted by a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoExport {
    Written(PathBuf),
    /// The export failed. The save and the counter still went through.
    Failed { path: PathBuf, error: String },
    /// No current filename to derive the export name from.
    Skipped,
}

impl AutoExport {
    /// User-facing notification text
    pub fn message(&self) -> String {
        match self {
            Self::Written(path) => format!("Auto-saved to: {}", display_name(path)),
            Self::Failed { error, .. } => format!("Failed to create auto-save file: {error}"),
            Self::Skipped => "Auto-save skipped: no current file name".to_string(),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Where automatic exports and manual backups land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupLocations {
    /// Public downloads-like directory
    pub downloads: PathBuf,
}

impl BackupLocations {
    pub fn new(downloads: impl Into<PathBuf>) -> Self {
        Self { downloads: downloads.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.downloads_dir())
    }

    /// `<downloads>/AS_<filename>`
    pub fn auto_save_path(&self, filename: &str) -> PathBuf {
        self.downloads.join(format!("{AUTO_SAVE_PREFIX}{filename}"))
    }

    /// `<downloads>/Backup`
    pub fn backup_dir(&self) -> PathBuf {
        self.downloads.join(BACKUP_SUBDIR)
    }

    /// `<downloads>/Backup/water_billing_backup_<timestamp>.xlsx`, creating the folder.
    pub fn manual_backup_path(&self, timestamp_millis: i64) -> io::Result<PathBuf> {
        let dir = self.backup_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir.join(manual_backup_file_name(timestamp_millis)))
    }
}

/// File name suggested for manual backups
pub fn manual_backup_file_name(timestamp_millis: i64) -> String {
    format!("water_billing_backup_{timestamp_millis}.xlsx")
}
