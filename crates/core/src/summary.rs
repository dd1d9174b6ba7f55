// Billing summary derived from a sheet. Never stored.

use serde::Serialize;

use crate::edit::previous_of;
use crate::model::{Sheet, CURRENT};
use crate::reading::reading_or_zero;

/// Maximum number of sample rows carried in a summary
pub const SAMPLE_LIMIT: usize = 3;

/// Column used to label sample rows when present
const NAME_COLUMN: &str = "Name";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRecord {
    pub name: String,
    pub current: String,
    pub previous: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSummary {
    pub total_records: usize,
    pub billed_records: usize,
    pub unbilled_records: usize,
    pub sample_records: Vec<SampleRecord>,
}

impl DataSummary {
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let total_records = sheet.rows.len();
        let billed_records = sheet
            .rows
            .iter()
            .filter(|row| is_billed(row.get(CURRENT).unwrap_or("")))
            .count();

        let name_column = if sheet.has_header(NAME_COLUMN) {
            Some(NAME_COLUMN)
        } else {
            sheet.headers.first().map(String::as_str)
        };

        let sample_records = sheet
            .rows
            .iter()
            .take(SAMPLE_LIMIT)
            .map(|row| SampleRecord {
                name: name_column
                    .and_then(|c| row.get(c))
                    .unwrap_or("")
                    .to_string(),
                current: row.get(CURRENT).unwrap_or("").to_string(),
                previous: previous_of(row).to_string(),
            })
            .collect();

        Self {
            total_records,
            billed_records,
            unbilled_records: total_records - billed_records,
            sample_records,
        }
    }

    /// One-line text for status output
    pub fn summary(&self) -> String {
        format!(
            "{} records · {} billed · {} unbilled",
            self.total_records, self.billed_records, self.unbilled_records
        )
    }
}

/// A row is billed once its Current reading is a positive number.
pub fn is_billed(current: &str) -> bool {
    reading_or_zero(current) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{row_of, Row};
    use proptest::prelude::*;

    #[test]
    fn test_summary_counts() {
        let sheet = Sheet::new(
            vec!["Name".into(), "Current".into()],
            vec![
                row_of("1", &[("Name", "John Doe"), ("Current", "100.00")]),
                row_of("2", &[("Name", "Jane Smith"), ("Current", "0.00")]),
            ],
        );
        let summary = DataSummary::from_sheet(&sheet);
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.billed_records, 1);
        assert_eq!(summary.unbilled_records, 1);
        assert_eq!(summary.summary(), "2 records · 1 billed · 1 unbilled");
    }

    #[test]
    fn test_sample_records() {
        let sheet = Sheet::new(
            vec!["Account".into(), "Current".into(), "Previous".into()],
            (1..=5)
                .map(|i| {
                    let account = format!("A-{i}");
                    row_of(&i.to_string(), &[("Account", account.as_str()), ("Current", "0")])
                })
                .collect(),
        );
        let summary = DataSummary::from_sheet(&sheet);
        assert_eq!(summary.sample_records.len(), SAMPLE_LIMIT);
        assert_eq!(summary.sample_records[0].name, "A-1");
        assert_eq!(summary.sample_records[0].previous, "0");
    }

    #[test]
    fn test_empty_sheet_summary() {
        let summary = DataSummary::from_sheet(&Sheet::default());
        assert_eq!(summary.total_records, 0);
        assert_eq!(summary.billed_records + summary.unbilled_records, 0);
        assert!(summary.sample_records.is_empty());
    }

    fn reading_text() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("0".to_string()),
            Just("abc".to_string()),
            (-1000i32..1000).prop_map(|n| n.to_string()),
            (-1000.0f64..1000.0).prop_map(|n| format!("{n:.2}")),
        ]
    }

    proptest! {
        #[test]
        fn prop_billed_plus_unbilled_is_total(
            currents in proptest::collection::vec(reading_text(), 0..50)
        ) {
            let rows: Vec<Row> = currents
                .iter()
                .enumerate()
                .map(|(i, c)| row_of(&(i + 1).to_string(), &[("Current", c.as_str())]))
                .collect();
            let expected_billed = currents
                .iter()
                .filter(|c| c.trim().parse::<f64>().map(|n| n > 0.0).unwrap_or(false))
                .count();
            let summary = DataSummary::from_sheet(&Sheet::new(vec!["Current".into()], rows));

            prop_assert_eq!(summary.billed_records, expected_billed);
            let counted = summary.billed_records + summary.unbilled_records;
            prop_assert_eq!(counted, summary.total_records);
        }
    }
}
