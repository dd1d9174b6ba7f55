// Billing sheet model and the arithmetic around meter readings.
//
// Pure crate: no file or storage access. The codec lives in waterbill-io and
// persistence in waterbill-store.

pub mod edit;
pub mod filter;
pub mod model;
pub mod reading;
pub mod summary;

pub use edit::{apply_reading, EditError, ReadingEdit};
pub use filter::{BillingFilter, GridCounts, RowQuery};
pub use model::{Row, Sheet, CONSUMED, CURRENT, FOR_EVALUATION, PREVIOUS, REQUIRED_COLUMNS};
pub use summary::{DataSummary, SampleRecord};
