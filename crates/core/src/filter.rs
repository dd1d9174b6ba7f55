//! Row filtering for the billing grid.
//!
//! The grid's notion of "billed" is textual: a Current cell that is
//! non-blank and not the literal `0`. The summary in `crate::summary`
//! classifies numerically instead; the two agree for clean numeric data.

use serde::{Deserialize, Serialize};

use crate::model::{Row, Sheet, CURRENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingFilter {
    #[default]
    All,
    Billed,
    Unbilled,
    ForEvaluation,
}

impl BillingFilter {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::All => true,
            Self::Billed => grid_billed(row),
            Self::Unbilled => !grid_billed(row),
            Self::ForEvaluation => row.for_evaluation(),
        }
    }
}

/// Filter plus free-text search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    pub filter: BillingFilter,
    pub search: String,
}

impl RowQuery {
    pub fn new(filter: BillingFilter, search: impl Into<String>) -> Self {
        Self { filter, search: search.into() }
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filter.matches(row) && search_matches(row, &self.search)
    }
}

/// Case-insensitive substring match against any column value.
pub fn search_matches(row: &Row, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    row.columns
        .values()
        .any(|value| value.to_lowercase().contains(&needle))
}

/// Rows visible under `query`, in sheet order
pub fn filter_rows<'a>(sheet: &'a Sheet, query: &RowQuery) -> Vec<&'a Row> {
    sheet.rows.iter().filter(|row| query.matches(row)).collect()
}

fn grid_billed(row: &Row) -> bool {
    match row.get(CURRENT).map(str::trim) {
        Some(current) => !current.is_empty() && current != "0",
        None => false,
    }
}

/// Counts shown above the grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GridCounts {
    pub billed: usize,
    pub unbilled: usize,
    pub for_evaluation: usize,
}

impl GridCounts {
    pub fn from_sheet(sheet: &Sheet) -> Self {
        sheet.rows.iter().fold(Self::default(), |mut acc, row| {
            if grid_billed(row) {
                acc.billed += 1;
            } else {
                acc.unbilled += 1;
            }
            if row.for_evaluation() {
                acc.for_evaluation += 1;
            }
            acc
        })
    }
}
