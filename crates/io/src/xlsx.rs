// Billing sheet import and export (xlsx only)
//
// Import: first worksheet, row 0 is the header row. Required columns missing
//         from the header row are appended, backfilled with "0", and written
//         back into the source file.
// Export: single "Sheet1", every value written as text. Not a styling
//         round-trip: number formats, widths and colors are not carried.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use waterbill_core::model::{
    default_value, is_required, Row, Sheet, REQUIRED_COLUMNS, REQUIRED_DEFAULT,
};

use crate::error::CodecError;
use crate::EXPORT_SHEET_NAME;

/// Statistics from one import
#[derive(Debug, Default, Clone)]
pub struct ReadReport {
    /// Data rows kept
    pub rows_read: usize,
    /// Rows dropped because every value was empty
    pub rows_skipped: usize,
    /// Header cells that were blank and ignored
    pub blank_headers: usize,
    /// Duplicate header names ignored (first occurrence wins)
    pub duplicate_headers: Vec<String>,
    /// Required columns appended to the header row
    pub columns_added: Vec<String>,
    /// Whether the source file was rewritten to include added columns
    pub source_rewritten: bool,
    /// Total import duration in milliseconds
    pub duration_ms: u128,
}

impl ReadReport {
    /// Returns a summary message suitable for display
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{} row{}",
            self.rows_read,
            if self.rows_read == 1 { "" } else { "s" }
        )];
        if self.rows_skipped > 0 {
            parts.push(format!("{} empty skipped", self.rows_skipped));
        }
        if !self.columns_added.is_empty() {
            parts.push(format!("added {}", self.columns_added.join(", ")));
        }
        parts.join(" · ")
    }
}

/// Import the first worksheet of an xlsx file.
pub fn read(path: &Path) -> Result<Sheet, CodecError> {
    read_with_report(path).map(|(sheet, _)| sheet)
}

/// Import the first worksheet of an xlsx file, with statistics.
///
/// Side effect: if a required column had to be added, `path` is rewritten
/// with the added header cells and "0" fills before returning.
pub fn read_with_report(path: &Path) -> Result<(Sheet, ReadReport), CodecError> {
    let start_time = Instant::now();
    let mut report = ReadReport::default();

    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let first_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| CodecError::Format("Excel file contains no sheets".to_string()))?;

    let range = workbook.worksheet_range(&first_name)?;

    // Header row: (source column, trimmed name)
    let mut columns: Vec<(u32, String)> = Vec::new();
    let (end_row, end_col) = range.end().unwrap_or((0, 0));
    if !range.is_empty() {
        for col in 0..=end_col {
            let text = range.get_value((0, col)).map(cell_text).unwrap_or_default();
            let name = text.trim();
            if name.is_empty() {
                report.blank_headers += 1;
                continue;
            }
            if columns.iter().any(|(_, existing)| existing == name) {
                log::warn!("duplicate header '{}' in column {} ignored", name, col);
                report.duplicate_headers.push(name.to_string());
                continue;
            }
            columns.push((col, name.to_string()));
        }
    }

    if columns.is_empty() {
        return Err(CodecError::Format("Excel file has no headers".to_string()));
    }

    // Append missing required columns after the last used column
    let mut next_col = end_col + 1;
    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|(_, name)| name == required) {
            columns.push((next_col, required.to_string()));
            report.columns_added.push(required.to_string());
            next_col += 1;
        }
    }

    // Cells materialized with "0" for the write-back
    let mut fills: Vec<(u32, u32)> = Vec::new();
    let mut rows = Vec::new();

    for row_idx in 1..=end_row {
        let mut values = std::collections::HashMap::with_capacity(columns.len());
        for (col, header) in &columns {
            let value = match range.get_value((row_idx, *col)) {
                None | Some(Data::Empty) => {
                    if is_required(header) {
                        fills.push((row_idx, *col));
                        REQUIRED_DEFAULT.to_string()
                    } else {
                        String::new()
                    }
                }
                Some(data) => cell_text(data).trim().to_string(),
            };
            values.insert(header.clone(), value);
        }

        let row = Row::new(row_idx.to_string(), values);
        if row.is_blank() {
            log::debug!("skipping empty row {} in '{}'", row_idx, first_name);
            report.rows_skipped += 1;
            continue;
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(CodecError::Format("Excel file has no data rows".to_string()));
    }

    if !report.columns_added.is_empty() {
        let mut image = WorkbookImage::default();
        for name in &sheet_names {
            let sheet_range = if *name == first_name {
                range.clone()
            } else {
                workbook.worksheet_range(name)?
            };
            image.push_sheet(name, &sheet_range);
        }

        let first = &mut image.sheets[0];
        for (col, header) in columns.iter().filter(|(col, _)| *col > end_col) {
            first.set(0, *col, CellImage::Text(header.clone()));
        }
        for (row, col) in &fills {
            first.set(*row, *col, CellImage::Text(REQUIRED_DEFAULT.to_string()));
        }

        // Release the read handle before replacing the file
        drop(workbook);
        image.save(path)?;
        report.source_rewritten = true;
        log::info!(
            "added {} to '{}' and rewrote the source file",
            report.columns_added.join(", "),
            path.display()
        );
    }

    report.rows_read = rows.len();
    report.duration_ms = start_time.elapsed().as_millis();

    let headers = columns.into_iter().map(|(_, name)| name).collect();
    Ok((Sheet::new(headers, rows), report))
}

/// Export a billing sheet to a fresh single-sheet xlsx file.
///
/// Header row is the sheet's headers plus any missing required columns.
/// The destination is replaced in one rename; on error it is left as it was.
/// Empty values leave the cell unwritten, so a blank Current or Consumed
/// reads back as "0".
pub fn write(path: &Path, sheet: &Sheet) -> Result<(), CodecError> {
    let headers = sheet.export_headers();

    let mut xlsx_workbook = XlsxWorkbook::new();
    let worksheet = xlsx_workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let target_row = row_idx as u32 + 1;
        for (col, header) in headers.iter().enumerate() {
            let value = row.get(header).unwrap_or_else(|| default_value(header));
            if value.is_empty() {
                continue;
            }
            worksheet.write_string(target_row, col as u16, value)?;
        }
    }

    let buffer = xlsx_workbook.save_to_buffer()?;
    replace_file(path, &buffer)?;

    log::debug!("exported {} rows to '{}'", sheet.rows.len(), path.display());
    Ok(())
}

/// Text form of a cell value, as shown in the billing grid
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => format_number(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => e.to_string(),
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

// Format nicely: integers without decimals
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), CodecError> {
    let tmp = temp_sibling(path);
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(CodecError::Io(format!("Could not write '{}': {}", path.display(), e)));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        CodecError::Io(format!("Could not replace '{}': {}", path.display(), e))
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "export.xlsx".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

// ============================================================================
// Workbook image (value-level copy used for the import write-back)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum CellImage {
    Text(String),
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Default)]
struct SheetImage {
    name: String,
    cells: BTreeMap<(u32, u32), CellImage>,
}

impl SheetImage {
    fn set(&mut self, row: u32, col: u32, cell: CellImage) {
        self.cells.insert((row, col), cell);
    }
}

#[derive(Debug, Default)]
struct WorkbookImage {
    sheets: Vec<SheetImage>,
}

impl WorkbookImage {
    fn push_sheet(&mut self, name: &str, range: &Range<Data>) {
        let mut sheet = SheetImage { name: name.to_string(), ..Default::default() };
        for (row, col, data) in range.used_cells() {
            let (row, col) = absolute(range, row, col);
            let cell = match data {
                Data::Empty => continue,
                Data::Float(n) => CellImage::Number(*n),
                Data::Int(n) => CellImage::Number(*n as f64),
                Data::DateTime(dt) => CellImage::Number(dt.as_f64()),
                Data::Bool(b) => CellImage::Bool(*b),
                other => CellImage::Text(cell_text(other)),
            };
            sheet.set(row, col, cell);
        }
        self.sheets.push(sheet);
    }

    fn save(&self, path: &Path) -> Result<(), CodecError> {
        let mut xlsx_workbook = XlsxWorkbook::new();
        for sheet in &self.sheets {
            let worksheet = xlsx_workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            for ((row, col), cell) in &sheet.cells {
                let col = *col as u16;
                match cell {
                    CellImage::Text(s) => worksheet.write_string(*row, col, s)?,
                    CellImage::Number(n) => worksheet.write_number(*row, col, *n)?,
                    CellImage::Bool(b) => worksheet.write_boolean(*row, col, *b)?,
                };
            }
        }
        let buffer = xlsx_workbook.save_to_buffer()?;
        replace_file(path, &buffer)
    }
}

/// `used_cells` yields positions relative to the range start
fn absolute(range: &Range<Data>, row: usize, col: usize) -> (u32, u32) {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    (start_row + row as u32, start_col + col as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterbill_core::model::{CONSUMED, CURRENT};

    /// Build an xlsx fixture from rows of optional text cells.
    fn fixture(dir: &Path, name: &str, rows: &[&[Option<&str>]]) -> PathBuf {
        let path = dir.join(name);
        let mut workbook = XlsxWorkbook::new();
        let worksheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(text) = cell {
                    worksheet.write_string(r as u32, c as u16, *text).unwrap();
                }
            }
        }
        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_read_appends_required_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            dir.path(),
            "accounts.xlsx",
            &[&[Some("Name"), Some("Amount")], &[Some("John Doe"), Some("100")]],
        );

        let (sheet, report) = read_with_report(&path).unwrap();
        assert_eq!(sheet.headers, vec!["Name", "Amount", "Current", "Consumed"]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].id, "1");
        assert_eq!(sheet.rows[0].get("Name"), Some("John Doe"));
        assert_eq!(sheet.rows[0].get(CURRENT), Some("0"));
        assert_eq!(sheet.rows[0].get(CONSUMED), Some("0"));
        assert_eq!(report.columns_added, vec!["Current", "Consumed"]);
        assert!(report.source_rewritten);

        // The source now carries the added columns; a second read adds nothing
        let (again, report) = read_with_report(&path).unwrap();
        assert_eq!(again.headers, sheet.headers);
        assert_eq!(again.rows[0].get(CURRENT), Some("0"));
        assert!(report.columns_added.is_empty());
        assert!(!report.source_rewritten);
    }

    #[test]
    fn test_read_keeps_source_untouched_when_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            dir.path(),
            "complete.xlsx",
            &[
                &[Some("Name"), Some("Previous"), Some("Current"), Some("Consumed")],
                &[Some("A"), Some("20"), Some("50"), Some("30")],
            ],
        );
        let before = fs::read(&path).unwrap();

        let (sheet, report) = read_with_report(&path).unwrap();
        assert_eq!(sheet.rows[0].get(CURRENT), Some("50"));
        assert!(!report.source_rewritten);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_read_trims_and_drops_blank_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            dir.path(),
            "blank_header.xlsx",
            &[
                &[Some("  Name "), None, Some("Current"), Some("Consumed")],
                &[Some(" Ana "), Some("ignored"), Some("5"), Some("5")],
            ],
        );
        let (sheet, report) = read_with_report(&path).unwrap();
        assert_eq!(sheet.headers, vec!["Name", "Current", "Consumed"]);
        assert_eq!(sheet.rows[0].get("Name"), Some("Ana"));
        assert_eq!(sheet.rows[0].get(CURRENT), Some("5"));
        assert_eq!(report.blank_headers, 1);
    }

    #[test]
    fn test_read_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            dir.path(),
            "gaps.xlsx",
            &[
                &[Some("Name"), Some("Address"), Some("Current"), Some("Consumed")],
                &[Some("Ana"), None, None, Some("3")],
            ],
        );
        let sheet = read(&path).unwrap();
        let row = &sheet.rows[0];
        assert_eq!(row.get("Address"), Some(""));
        assert_eq!(row.get(CURRENT), Some("0"));
        assert_eq!(row.get(CONSUMED), Some("3"));
    }

    #[test]
    fn test_read_skips_empty_rows_and_keeps_source_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            dir.path(),
            "sparse.xlsx",
            &[
                &[Some("Name"), Some("Current"), Some("Consumed")],
                &[Some("Ana"), Some("1"), Some("1")],
                &[Some(" "), Some("  "), Some(" ")],
                &[Some("Ben"), Some("2"), Some("2")],
            ],
        );
        let (sheet, report) = read_with_report(&path).unwrap();
        let ids: Vec<&str> = sheet.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(report.rows_skipped, 1);
    }

    #[test]
    fn test_read_no_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(dir.path(), "empty.xlsx", &[]);
        match read(&path) {
            Err(CodecError::Format(msg)) => assert_eq!(msg, "Excel file has no headers"),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_no_data_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            dir.path(),
            "headers_only.xlsx",
            &[&[Some("Name"), Some("Current"), Some("Consumed")]],
        );
        match read(&path) {
            Err(CodecError::Format(msg)) => assert_eq!(msg, "Excel file has no data rows"),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_wrong_file_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_excel.xlsx");
        fs::write(&path, "Name,Current\nAna,1\n").unwrap();
        assert!(matches!(read(&path), Err(CodecError::WrongFileType)));
    }

    #[test]
    fn test_read_missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let result = read(&dir.path().join("missing.xlsx"));
        assert!(matches!(result, Err(CodecError::Io(_))));
    }

    #[test]
    fn test_read_numbers_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.xlsx");
        let mut workbook = XlsxWorkbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Name").unwrap();
        worksheet.write_string(0, 1, "Previous").unwrap();
        worksheet.write_string(0, 2, "Current").unwrap();
        worksheet.write_string(0, 3, "Consumed").unwrap();
        worksheet.write_string(1, 0, "Ana").unwrap();
        worksheet.write_number(1, 1, 20.0).unwrap();
        worksheet.write_number(1, 2, 32.5).unwrap();
        worksheet.write_number(1, 3, 12.5).unwrap();
        workbook.save(&path).unwrap();

        let sheet = read(&path).unwrap();
        assert_eq!(sheet.rows[0].get("Previous"), Some("20"));
        assert_eq!(sheet.rows[0].get(CURRENT), Some("32.5"));
    }

    #[test]
    fn test_write_back_preserves_other_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_sheets.xlsx");
        let mut workbook = XlsxWorkbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Accounts").unwrap();
        first.write_string(0, 0, "Name").unwrap();
        first.write_string(1, 0, "Ana").unwrap();
        let second = workbook.add_worksheet();
        second.set_name("Rates").unwrap();
        second.write_string(0, 0, "Tier").unwrap();
        second.write_number(1, 0, 12.0).unwrap();
        workbook.save(&path).unwrap();

        read(&path).unwrap();

        let mut reopened: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(reopened.sheet_names(), vec!["Accounts".to_string(), "Rates".to_string()]);
        let rates = reopened.worksheet_range("Rates").unwrap();
        assert_eq!(rates.get_value((1, 0)), Some(&Data::Float(12.0)));
        let accounts = reopened.worksheet_range("Accounts").unwrap();
        assert_eq!(accounts.get_value((0, 1)), Some(&Data::String("Current".to_string())));
        assert_eq!(accounts.get_value((1, 1)), Some(&Data::String("0".to_string())));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = fixture(
            dir.path(),
            "source.xlsx",
            &[
                &[Some("Account"), Some("Name"), Some("Previous")],
                &[Some("A-1"), Some("Ana"), Some("20")],
                &[Some("A-2"), Some("Ben"), Some("7")],
            ],
        );
        let imported = read(&source).unwrap();

        let exported = dir.path().join("exported.xlsx");
        write(&exported, &imported).unwrap();
        let reread = read(&exported).unwrap();

        assert_eq!(reread.headers, imported.headers);
        assert_eq!(reread.rows.len(), imported.rows.len());
        for (a, b) in imported.rows.iter().zip(&reread.rows) {
            assert_eq!(a.columns, b.columns);
        }
        assert_eq!(reread.rows[1].get("Previous"), Some("7"));
        assert_eq!(reread.rows[1].get(CURRENT), Some("0"));
    }

    #[test]
    fn test_blank_required_cells_read_back_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let columns = [
            ("Name".to_string(), "Ana".to_string()),
            (CURRENT.to_string(), String::new()),
            (CONSUMED.to_string(), String::new()),
        ];
        let sheet = Sheet::new(
            vec!["Name".into(), CURRENT.into(), CONSUMED.into()],
            vec![Row::new("1", columns.into_iter().collect())],
        );
        let path = dir.path().join("blank.xlsx");
        write(&path, &sheet).unwrap();

        let (reread, report) = read_with_report(&path).unwrap();
        assert_eq!(reread.rows[0].get("Name"), Some("Ana"));
        assert_eq!(reread.rows[0].get(CURRENT), Some("0"));
        assert_eq!(reread.rows[0].get(CONSUMED), Some("0"));
        assert!(!report.source_rewritten);
    }

    #[test]
    fn test_write_adds_missing_required_columns() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = Sheet::new(
            vec!["Name".into()],
            vec![Row::new("1", [("Name".to_string(), "Ana".to_string())].into_iter().collect())],
        );
        let path = dir.path().join("out.xlsx");
        write(&path, &sheet).unwrap();

        let mut reopened: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(reopened.sheet_names(), vec![EXPORT_SHEET_NAME.to_string()]);
        let range = reopened.worksheet_range(EXPORT_SHEET_NAME).unwrap();
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("Current".to_string())));
        assert_eq!(range.get_value((0, 2)), Some(&Data::String("Consumed".to_string())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("0".to_string())));
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn test_write_to_missing_directory_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.xlsx");
        let result = write(&path, &Sheet::new(vec!["Name".into()], vec![]));
        assert!(matches!(result, Err(CodecError::Io(_))));
    }

    #[test]
    fn test_read_report_summary() {
        let mut report = ReadReport::default();
        report.rows_read = 1;
        assert_eq!(report.summary(), "1 row");

        report.rows_read = 12;
        report.rows_skipped = 2;
        report.columns_added = vec!["Current".into()];
        assert_eq!(report.summary(), "12 rows · 2 empty skipped · added Current");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(50.0), "50");
        assert_eq!(format_number(32.5), "32.5");
    }
}
