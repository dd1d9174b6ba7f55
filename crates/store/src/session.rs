// Edit session: the in-memory sheet plus the store it saves through.

use std::path::{Path, PathBuf};

use waterbill_config::PreferencesBackend;
use waterbill_core::edit::is_successful_bill;
use waterbill_core::filter::filter_rows;
use waterbill_core::{
    apply_reading, DataSummary, GridCounts, ReadingEdit, Row, RowQuery, Sheet, CURRENT,
};
use waterbill_io::xlsx::{self, ReadReport};

use crate::document_store::{DocumentStore, SaveOptions, SaveOutcome};
use crate::error::SessionError;

pub struct BillingSession<B: PreferencesBackend> {
    store: DocumentStore<B>,
    sheet: Option<Sheet>,
}

impl<B: PreferencesBackend> BillingSession<B> {
    /// Start a session on whatever the store last saved.
    pub fn open(store: DocumentStore<B>) -> Self {
        let sheet = store.get();
        if let Some(sheet) = &sheet {
            log::debug!("session opened with {} stored rows", sheet.len());
        }
        Self { store, sheet }
    }

    pub fn store(&self) -> &DocumentStore<B> {
        &self.store
    }

    pub fn sheet(&self) -> Option<&Sheet> {
        self.sheet.as_ref()
    }

    fn loaded(&self) -> Result<&Sheet, SessionError> {
        self.sheet.as_ref().ok_or(SessionError::NoData)
    }

    /// Load a billing file, replacing the current sheet.
    ///
    /// On failure the current sheet and stored state are untouched.
    pub fn import(&mut self, path: &Path) -> Result<(ReadReport, SaveOutcome), SessionError> {
        let (sheet, report) = xlsx::read_with_report(path)?;

        let filename = path.file_name().map(|n| n.to_string_lossy().to_string());
        self.store.set_current_filename(filename.as_deref())?;
        let outcome = self.store.save(&sheet, SaveOptions::default())?;

        log::info!("imported {} ({})", path.display(), report.summary());
        self.sheet = Some(sheet);
        Ok((report, outcome))
    }

    /// Apply a new reading to one row and save.
    ///
    /// A rejected edit or a failed save leaves the in-memory row as it was.
    pub fn update_row(
        &mut self,
        row_id: &str,
        edit: &ReadingEdit,
    ) -> Result<(Row, SaveOutcome), SessionError> {
        let old = self
            .loaded()?
            .row(row_id)
            .ok_or_else(|| SessionError::UnknownRow(row_id.to_string()))?;
        let updated = apply_reading(old, edit)?;
        let successful_bill = is_successful_bill(old.value_or_default(CURRENT), &edit.current);
        let options = SaveOptions { force_write: !self.store.autosave_enabled()?, successful_bill };

        let sheet = self.sheet.as_mut().ok_or(SessionError::NoData)?;
        let previous = sheet.replace_row(updated.clone());
        let outcome = match self.store.save(sheet, options) {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(previous) = previous {
                    sheet.replace_row(previous);
                }
                return Err(e.into());
            }
        };
        if let Some(export) = &outcome.auto_export {
            log::info!("{}", export.message());
        }
        Ok((updated, outcome))
    }

    /// Export the in-memory sheet.
    pub fn export(&self, dest: &Path) -> Result<(), SessionError> {
        xlsx::write(dest, self.loaded()?)?;
        log::info!("exported to {}", dest.display());
        Ok(())
    }

    /// Back up the stored sheet to `dest`, or to a timestamped file in the
    /// backup folder when `dest` is None.
    pub fn backup(&self, dest: Option<&Path>) -> Result<PathBuf, SessionError> {
        match dest {
            Some(dest) => {
                if self.store.create_backup(dest)? {
                    Ok(dest.to_path_buf())
                } else {
                    Err(SessionError::NoData)
                }
            }
            None => self.store.create_emergency_backup()?.ok_or(SessionError::NoData),
        }
    }

    /// Replace the current sheet with the contents of a backup file.
    pub fn restore(&mut self, source: &Path) -> Result<SaveOutcome, SessionError> {
        let (sheet, outcome) = self.store.restore_from_backup(source)?;
        self.sheet = Some(sheet);
        Ok(outcome)
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.store.clear()?;
        self.sheet = None;
        Ok(())
    }

    pub fn set_autosave(&self, enabled: bool) -> Result<(), SessionError> {
        self.store.set_autosave_enabled(enabled)?;
        Ok(())
    }

    pub fn summary(&self) -> Result<DataSummary, SessionError> {
        Ok(DataSummary::from_sheet(self.loaded()?))
    }

    pub fn counts(&self) -> Result<GridCounts, SessionError> {
        Ok(GridCounts::from_sheet(self.loaded()?))
    }

    /// Rows visible under a grid filter and search
    pub fn query(&self, query: &RowQuery) -> Result<Vec<&Row>, SessionError> {
        Ok(filter_rows(self.loaded()?, query))
    }
}
