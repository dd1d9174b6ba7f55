use std::fmt;

use waterbill_config::ConfigError;
use waterbill_core::EditError;
use waterbill_io::CodecError;

#[derive(Debug)]
pub enum StoreError {
    /// The preferences backend failed to load or store.
    Config(ConfigError),
    /// The sheet could not be serialized.
    Serialize(String),
    /// Reading or writing a spreadsheet failed.
    Codec(CodecError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Failed to save data: {e}"),
            Self::Serialize(msg) => write!(f, "Failed to save data: {msg}"),
            Self::Codec(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<ConfigError> for StoreError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CodecError> for StoreError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

#[derive(Debug)]
pub enum SessionError {
    Store(StoreError),
    /// Edit rejected by validation; the row is unchanged.
    Edit(EditError),
    /// No sheet is loaded.
    NoData,
    /// No row with this id in the loaded sheet.
    UnknownRow(String),
}

impl SessionError {
    /// The codec error underneath, if any
    pub fn codec(&self) -> Option<&CodecError> {
        match self {
            Self::Store(StoreError::Codec(e)) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{e}"),
            Self::Edit(e) => write!(f, "{e}"),
            Self::NoData => write!(f, "No data loaded"),
            Self::UnknownRow(id) => write!(f, "No row with id '{id}'"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<CodecError> for SessionError {
    fn from(e: CodecError) -> Self {
        Self::Store(StoreError::Codec(e))
    }
}

impl From<EditError> for SessionError {
    fn from(e: EditError) -> Self {
        Self::Edit(e)
    }
}
