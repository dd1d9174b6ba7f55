use std::fmt;

#[derive(Debug)]
pub enum CodecError {
    /// Not an xlsx container at all (wrong extension, csv renamed, legacy .xls).
    WrongFileType,
    /// Readable container but unusable content: no sheets, no headers, no data rows.
    Format(String),
    /// File could not be opened, read, or written.
    Io(String),
}

impl CodecError {
    pub fn is_format(&self) -> bool {
        matches!(self, Self::WrongFileType | Self::Format(_))
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongFileType => write!(f, "Invalid Excel file format. Please use .xlsx format."),
            Self::Format(msg) => write!(f, "{msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<calamine::XlsxError> for CodecError {
    fn from(e: calamine::XlsxError) -> Self {
        match e {
            calamine::XlsxError::Io(io) => Self::Io(io.to_string()),
            calamine::XlsxError::Zip(_) => Self::WrongFileType,
            other => Self::Format(format!("Could not read Excel file: {other}")),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for CodecError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        match e {
            rust_xlsxwriter::XlsxError::IoError(io) => Self::Io(io.to_string()),
            other => Self::Io(format!("Failed to build XLSX file: {other}")),
        }
    }
}
