// Document store: the persisted snapshot of the billing sheet plus the
// settings that travel with it (autosave flag, bill-cycle counter, file name).
//
// Every operation takes the backend lock for its whole read-modify-write, so
// a save racing a clear is applied in some order, never interleaved.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use waterbill_config::prefs::BILL_CYCLE;
use waterbill_config::{Preferences, PreferencesBackend};
use waterbill_core::{DataSummary, Sheet};

use crate::backup::{AutoExport, BackupLocations, SheetExporter, XlsxExporter};
use crate::error::StoreError;
use crate::now_millis;

/// Flags for [`DocumentStore::save`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Persist even when autosave is disabled
    pub force_write: bool,
    /// This save records a 0 -> positive Current transition
    pub successful_bill: bool,
}

impl SaveOptions {
    pub fn forced() -> Self {
        Self { force_write: true, successful_bill: false }
    }
}

/// What a save actually did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    /// False when autosave was off and the write was not forced
    pub persisted: bool,
    /// Set when this save closed a bill cycle
    pub auto_export: Option<AutoExport>,
}

pub struct DocumentStore<B: PreferencesBackend> {
    backend: Mutex<B>,
    exporter: Arc<dyn SheetExporter>,
    locations: BackupLocations,
}

impl<B: PreferencesBackend> DocumentStore<B> {
    pub fn new(backend: B, locations: BackupLocations) -> Self {
        Self::with_exporter(backend, locations, Arc::new(XlsxExporter))
    }

    pub fn with_exporter(
        backend: B,
        locations: BackupLocations,
        exporter: Arc<dyn SheetExporter>,
    ) -> Self {
        Self { backend: Mutex::new(backend), exporter, locations }
    }

    pub fn locations(&self) -> &BackupLocations {
        &self.locations
    }

    fn load(backend: &B) -> Result<Preferences, StoreError> {
        Ok(backend.load()?)
    }

    /// Most recently saved sheet. Missing or undecodable snapshots read as None.
    pub fn get(&self) -> Option<Sheet> {
        let backend = self.backend.lock();
        let prefs = match backend.load() {
            Ok(prefs) => prefs,
            Err(e) => {
                log::error!("Failed to load stored data: {}", e);
                return None;
            }
        };
        let json = prefs.excel_data?;
        match Sheet::from_json(&json) {
            Ok(sheet) => Some(sheet),
            Err(e) => {
                log::warn!("Stored sheet is corrupt, treating as empty: {}", e);
                None
            }
        }
    }

    /// Persist `sheet` if forced or autosave is on.
    ///
    /// A successful bill advances the counter (mod 5). When the counter was at
    /// 4 and autosave is on, the sheet is also exported to `AS_<filename>`;
    /// export failures land in the outcome and do not fail the save. Snapshot
    /// and counter go to the backend in one store.
    pub fn save(&self, sheet: &Sheet, options: SaveOptions) -> Result<SaveOutcome, StoreError> {
        let backend = self.backend.lock();
        let mut prefs = Self::load(&backend)?;

        if !options.force_write && !prefs.autosave() {
            log::debug!("autosave disabled, save skipped");
            return Ok(SaveOutcome::default());
        }

        let json = sheet.to_json().map_err(|e| StoreError::Serialize(e.to_string()))?;
        prefs.excel_data = Some(json);
        prefs.last_modified = Some(now_millis());

        let mut auto_export = None;
        if options.successful_bill {
            if prefs.bill_count() == BILL_CYCLE - 1 && prefs.autosave() {
                let filename = prefs.current_filename.as_deref();
                auto_export = Some(self.auto_export(sheet, filename));
            }
            prefs.advance_bill_count();
        }

        backend.store(&prefs)?;
        Ok(SaveOutcome { persisted: true, auto_export })
    }

    fn auto_export(&self, sheet: &Sheet, filename: Option<&str>) -> AutoExport {
        let Some(filename) = filename else {
            log::warn!("bill cycle complete but no current filename; auto-save skipped");
            return AutoExport::Skipped;
        };

        let path = self.locations.auto_save_path(filename);
        let result = fs::create_dir_all(&self.locations.downloads)
            .map_err(|e| e.to_string())
            .and_then(|_| self.exporter.export(&path, sheet).map_err(|e| e.to_string()));

        match result {
            Ok(()) => {
                log::info!("Auto-saved to {}", path.display());
                AutoExport::Written(path)
            }
            Err(error) => {
                log::error!("Failed to create auto-save file {}: {}", path.display(), error);
                AutoExport::Failed { path, error }
            }
        }
    }

    /// Wipe everything; the bill counter reads 0 afterwards.
    pub fn clear(&self) -> Result<(), StoreError> {
        let backend = self.backend.lock();
        backend.store(&Preferences { bill_count: Some(0), ..Default::default() })?;
        log::info!("stored data cleared");
        Ok(())
    }

    pub fn set_autosave_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.update(|prefs| prefs.autosave_enabled = Some(enabled))
    }

    pub fn set_current_filename(&self, filename: Option<&str>) -> Result<(), StoreError> {
        self.update(|prefs| prefs.current_filename = filename.map(String::from))
    }

    fn update(&self, f: impl FnOnce(&mut Preferences)) -> Result<(), StoreError> {
        let backend = self.backend.lock();
        let mut prefs = Self::load(&backend)?;
        f(&mut prefs);
        backend.store(&prefs)?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Preferences) -> T) -> Result<T, StoreError> {
        let backend = self.backend.lock();
        let prefs = Self::load(&backend)?;
        Ok(f(&prefs))
    }

    pub fn autosave_enabled(&self) -> Result<bool, StoreError> {
        self.read(Preferences::autosave)
    }

    pub fn bill_count(&self) -> Result<u8, StoreError> {
        self.read(Preferences::bill_count)
    }

    pub fn current_filename(&self) -> Result<Option<String>, StoreError> {
        self.read(|prefs| prefs.current_filename.clone())
    }

    pub fn last_modified(&self) -> Result<Option<i64>, StoreError> {
        self.read(|prefs| prefs.last_modified)
    }

    /// Summary of the stored sheet, if any
    pub fn data_summary(&self) -> Option<DataSummary> {
        self.get().map(|sheet| DataSummary::from_sheet(&sheet))
    }

    /// Export the stored sheet to `dest`. Ok(false) when nothing is stored.
    pub fn create_backup(&self, dest: &Path) -> Result<bool, StoreError> {
        let Some(sheet) = self.get() else {
            return Ok(false);
        };
        self.exporter.export(dest, &sheet)?;
        log::info!("backup written to {}", dest.display());
        Ok(true)
    }

    /// Timestamped backup into `<downloads>/Backup`. Ok(None) when nothing is stored.
    pub fn create_emergency_backup(&self) -> Result<Option<PathBuf>, StoreError> {
        let path = self
            .locations
            .manual_backup_path(now_millis())
            .map_err(|e| StoreError::Codec(e.into()))?;
        Ok(self.create_backup(&path)?.then_some(path))
    }

    /// Read `source` and store it through the non-forced save path.
    ///
    /// With autosave off the restored sheet is returned but not persisted;
    /// check `SaveOutcome::persisted`.
    pub fn restore_from_backup(&self, source: &Path) -> Result<(Sheet, SaveOutcome), StoreError> {
        let sheet = waterbill_io::xlsx::read(source)?;
        let outcome = self.save(&sheet, SaveOptions::default())?;
        if !outcome.persisted {
            log::warn!("restored {} but autosave is off; not persisted", source.display());
        }
        Ok((sheet, outcome))
    }
}
