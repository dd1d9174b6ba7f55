//! `waterbill-store`: persistence and autosave policy for the billing sheet.
//!
//! Flow: codec read -> session holds the sheet -> edits go through
//! `BillingSession::update_row` -> `DocumentStore::save` decides whether to
//! persist and whether the bill cycle triggers an automatic export.

pub mod backup;
pub mod document_store;
pub mod error;
pub mod session;

pub use backup::{AutoExport, BackupLocations, SheetExporter, XlsxExporter};
pub use document_store::{DocumentStore, SaveOptions, SaveOutcome};
pub use error::{SessionError, StoreError};
pub use session::BillingSession;

/// Current time as epoch milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
