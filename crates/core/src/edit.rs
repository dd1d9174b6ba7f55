// Row edit: accept a new Current reading, recompute Consumed.

use std::fmt;

use crate::model::{Row, CONSUMED, CURRENT, FOR_EVALUATION, PREVIOUS};
use crate::reading::{format_reading, reading_or_zero};

/// What the user entered for one row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadingEdit {
    /// New text for the Current column. Blank means "not yet billed".
    pub current: String,
    pub for_evaluation: bool,
}

impl ReadingEdit {
    pub fn new(current: impl Into<String>, for_evaluation: bool) -> Self {
        Self { current: current.into(), for_evaluation }
    }
}

/// Rejected edit. The row it was aimed at stays as it was.
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    /// Current reading is lower than the Previous reading.
    BelowPrevious { current: f64, previous: f64 },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowPrevious { .. } => {
                write!(f, "Current value cannot be less than Previous value")
            }
        }
    }
}

impl std::error::Error for EditError {}

/// Previous reading of a row; "0" when the column is absent.
pub fn previous_of(row: &Row) -> &str {
    row.get(PREVIOUS).unwrap_or("0")
}

/// Check a new Current value against the row's Previous value.
/// Text that is not a number counts as 0.
pub fn validate_reading(current: &str, previous: &str) -> Result<(), EditError> {
    if current.trim().is_empty() {
        return Ok(());
    }
    let current_value = reading_or_zero(current);
    let previous_value = reading_or_zero(previous);

    if current_value < previous_value {
        return Err(EditError::BelowPrevious {
            current: current_value,
            previous: previous_value,
        });
    }
    Ok(())
}

/// Consumed = Current - Previous. Blank current or a negative result gives "".
pub fn calculate_consumed(current: &str, previous: &str) -> String {
    if current.trim().is_empty() {
        return String::new();
    }
    let consumed = reading_or_zero(current) - reading_or_zero(previous);
    if consumed < 0.0 {
        String::new()
    } else {
        format_reading(consumed)
    }
}

/// Validate `edit` against `row` and produce the updated row.
pub fn apply_reading(row: &Row, edit: &ReadingEdit) -> Result<Row, EditError> {
    let previous = previous_of(row);
    validate_reading(&edit.current, previous)?;

    let consumed = calculate_consumed(&edit.current, previous);
    let mut updated = row.clone();
    updated.set(CURRENT, edit.current.trim());
    updated.set(CONSUMED, consumed);
    updated.set(FOR_EVALUATION, edit.for_evaluation.to_string());
    Ok(updated)
}

/// A bill counts when Current moves from exactly zero to a positive reading.
pub fn is_successful_bill(old_current: &str, new_current: &str) -> bool {
    reading_or_zero(old_current) == 0.0 && reading_or_zero(new_current) > 0.0
}
