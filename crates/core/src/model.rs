// Tabular document model: ordered headers plus rows keyed by header name.
//
// All cell values are text. Numeric columns are parsed on demand through
// `crate::reading`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Meter reading entered by the field agent
pub const CURRENT: &str = "Current";

/// Derived: Current - Previous
pub const CONSUMED: &str = "Consumed";

/// Reading from the previous cycle (optional column)
pub const PREVIOUS: &str = "Previous";

/// Literal "true"/"false" flag toggled per row (optional column)
pub const FOR_EVALUATION: &str = "ForEvaluation";

/// Columns that every sheet carries, in the order they are appended when missing.
pub const REQUIRED_COLUMNS: [&str; 2] = [CURRENT, CONSUMED];

/// Value used to backfill a required column.
pub const REQUIRED_DEFAULT: &str = "0";

/// Returns true if `header` is one of [`REQUIRED_COLUMNS`].
pub fn is_required(header: &str) -> bool {
    REQUIRED_COLUMNS.contains(&header)
}

/// Default text for a header with no value in a row.
pub fn default_value(header: &str) -> &'static str {
    if is_required(header) {
        REQUIRED_DEFAULT
    } else {
        ""
    }
}

/// One data row. `id` is the 1-based row index in the source file, as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub columns: HashMap<String, String>,
}

impl Row {
    pub fn new(id: impl Into<String>, columns: HashMap<String, String>) -> Self {
        Self { id: id.into(), columns }
    }

    /// Cell text for a column, if present
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// Cell text for a column, or its default when absent
    pub fn value_or_default(&self, column: &str) -> &str {
        self.get(column).unwrap_or_else(|| default_value(column))
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.columns.insert(column.into(), value.into());
    }

    /// The ForEvaluation flag (case-insensitive "true").
    pub fn for_evaluation(&self) -> bool {
        self.get(FOR_EVALUATION)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// True if every column value is empty
    pub fn is_blank(&self) -> bool {
        self.columns.values().all(|v| v.is_empty())
    }
}

/// In-memory tabular document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    /// Find a row by id
    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Replace the row with the same id, returning the previous version.
    /// Returns None (and leaves the sheet untouched) if no row has that id.
    pub fn replace_row(&mut self, row: Row) -> Option<Row> {
        let slot = self.rows.iter_mut().find(|r| r.id == row.id)?;
        Some(std::mem::replace(slot, row))
    }

    /// Required columns missing from `headers`, in append order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !self.has_header(c))
            .collect()
    }

    /// Headers followed by any missing required columns. Does not modify the sheet.
    pub fn export_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        headers.extend(self.missing_required().into_iter().map(String::from));
        headers
    }

    /// Append missing required headers and backfill every row with "0".
    /// Returns the names that were added.
    pub fn ensure_required_columns(&mut self) -> Vec<&'static str> {
        let added = self.missing_required();
        for column in &added {
            self.headers.push(column.to_string());
        }
        for row in &mut self.rows {
            for column in REQUIRED_COLUMNS {
                row.columns
                    .entry(column.to_string())
                    .or_insert_with(|| REQUIRED_DEFAULT.to_string());
            }
        }
        added
    }

    /// Serialize to the JSON snapshot format used by the store.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a JSON snapshot. Unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
pub(crate) fn row_of(id: &str, pairs: &[(&str, &str)]) -> Row {
    Row::new(
        id,
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    )
}
