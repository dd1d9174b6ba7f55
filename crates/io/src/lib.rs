// File I/O operations

pub mod error;
pub mod xlsx;

pub use error::CodecError;

/// Name of the single sheet in exported files
pub const EXPORT_SHEET_NAME: &str = "Sheet1";
