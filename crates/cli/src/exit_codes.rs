//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 1    | General error (unspecified)                        |
//! | 2    | Usage error (bad args, unknown row id)             |
//! | 3    | Spreadsheet format error (not xlsx, no headers...) |
//! | 4    | I/O error (missing file, unwritable store)         |
//! | 5    | Edit rejected by validation                        |
//! | 6    | No billing data loaded                             |

use waterbill_config::ConfigError;
use waterbill_io::CodecError;
use waterbill_store::{SessionError, StoreError};

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options, unknown row.
pub const EXIT_USAGE: u8 = 2;

/// The file is not a readable billing spreadsheet.
pub const EXIT_FORMAT: u8 = 3;

/// Reading or writing a file failed.
pub const EXIT_IO: u8 = 4;

/// The reading was rejected for being below Previous.
/// The row is unchanged.
pub const EXIT_EDIT_REJECTED: u8 = 5;

/// Nothing has been imported yet, or the store was cleared.
pub const EXIT_NO_DATA: u8 = 6;

/// Map a SessionError to its exit code.
pub fn session_exit_code(err: &SessionError) -> u8 {
    match err {
        SessionError::Edit(_) => EXIT_EDIT_REJECTED,
        SessionError::NoData => EXIT_NO_DATA,
        SessionError::UnknownRow(_) => EXIT_USAGE,
        SessionError::Store(store) => store_exit_code(store),
    }
}

fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::Codec(CodecError::Io(_)) => EXIT_IO,
        StoreError::Codec(_) => EXIT_FORMAT,
        StoreError::Config(ConfigError::Io(_)) => EXIT_IO,
        StoreError::Config(_) | StoreError::Serialize(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterbill_core::EditError;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_FORMAT,
            EXIT_IO,
            EXIT_EDIT_REJECTED,
            EXIT_NO_DATA,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn test_session_mapping() {
        let edit = SessionError::Edit(EditError::BelowPrevious { current: 1.0, previous: 2.0 });
        assert_eq!(session_exit_code(&edit), EXIT_EDIT_REJECTED);
        assert_eq!(session_exit_code(&SessionError::NoData), EXIT_NO_DATA);
        assert_eq!(session_exit_code(&SessionError::UnknownRow("7".into())), EXIT_USAGE);
        assert_eq!(
            session_exit_code(&CodecError::WrongFileType.into()),
            EXIT_FORMAT
        );
        assert_eq!(
            session_exit_code(&CodecError::Io("No such file".into()).into()),
            EXIT_IO
        );
    }
}
