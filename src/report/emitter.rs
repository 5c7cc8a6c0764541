//! Workbook emitter
//!
//! Writes typed report rows and correlated contact blocks into `.xlsx`
//! worksheets with a fixed set of cell formats. Column widths follow the
//! widest value written so far; headings wrap instead of widening their
//! column. Panes are frozen below the heading row and right of the epoch
//! column once a sheet is finished.

use std::path::Path;

use rust_xlsxwriter::utility::column_number_to_name;
use rust_xlsxwriter::{Format, FormatAlign, Formula, Workbook, Worksheet, XlsxError};
use tracing::info;

use super::selector::{DerivedColumns, SelectedRow};
use super::timestamp::format_gmat_time;
use super::ReportError;
use crate::config::defaults::{
    DATETIME_NUM_FORMAT, HEADING_WRAP_LEN, MAX_COLUMN_WIDTH, MAX_SHEET_NAME_LEN,
};
use crate::types::{Cell, VisibilityWindow};

/// Width given to derived formula columns; the formula text itself is long.
const FORMULA_COLUMN_WIDTH: f64 = 10.0;

// ============================================================================
// Formats
// ============================================================================

/// The cell formats shared by every sheet of a workbook.
#[derive(Debug, Clone)]
pub struct CellFormats {
    pub heading: Format,
    pub wrap: Format,
    pub two_places: Format,
    pub four_places: Format,
    pub datetime: Format,
}

impl Default for CellFormats {
    fn default() -> Self {
        Self {
            heading: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            wrap: Format::new()
                .set_text_wrap()
                .set_align(FormatAlign::VerticalCenter),
            two_places: Format::new()
                .set_num_format("0.00")
                .set_align(FormatAlign::VerticalCenter),
            four_places: Format::new()
                .set_num_format("0.0000")
                .set_align(FormatAlign::VerticalCenter),
            datetime: Format::new()
                .set_num_format(DATETIME_NUM_FORMAT)
                .set_align(FormatAlign::VerticalCenter),
        }
    }
}

impl CellFormats {
    fn number(&self, places: u8) -> &Format {
        if places >= 4 {
            &self.four_places
        } else {
            &self.two_places
        }
    }
}

// ============================================================================
// Column widths
// ============================================================================

/// Widest value seen per column.
#[derive(Debug, Clone, Default)]
pub struct ColumnWidths {
    widths: Vec<f64>,
}

impl ColumnWidths {
    /// Record a value of `width` in `col`. Returns the new width when the column grew.
    pub fn observe(&mut self, col: u16, width: f64) -> Option<f64> {
        let col = usize::from(col);
        let width = width.min(MAX_COLUMN_WIDTH);
        if self.widths.len() <= col {
            self.widths.resize(col + 1, 0.0);
        }
        if width > self.widths[col] {
            self.widths[col] = width;
            Some(width)
        } else {
            None
        }
    }

    pub fn get(&self, col: u16) -> Option<f64> {
        self.widths.get(usize::from(col)).copied()
    }
}

#[allow(clippy::cast_precision_loss)]
fn text_width(text: &str) -> f64 {
    (text.chars().count() + 1) as f64
}

fn cell_width(cell: &Cell) -> f64 {
    match cell {
        Cell::Empty => 0.0,
        Cell::Timestamp(t) => text_width(&format_gmat_time(t)),
        Cell::Number { value, places } => text_width(&format!("{value:.prec$}", prec = usize::from(*places))),
        Cell::Text(text) => text_width(text),
    }
}

// ============================================================================
// Sheet names
// ============================================================================

/// A valid, unused Excel sheet name derived from `raw`.
///
/// Forbidden characters are replaced, the name is cut to 31 characters, and a
/// numeric suffix is added if the name (case-insensitively) is taken.
pub fn sheet_name(raw: &str, taken: &[String]) -> String {
    let cleaned: String = raw
        .trim()
        .trim_matches('\'')
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let base = if cleaned.is_empty() { "Sheet".to_string() } else { cleaned };

    let is_taken = |name: &str| taken.iter().any(|t| t.eq_ignore_ascii_case(name));
    if !is_taken(&base) {
        return base;
    }
    (2..)
        .map(|n| {
            let suffix = format!("_{n}");
            let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.len());
            format!("{}{suffix}", base.chars().take(keep).collect::<String>())
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or(base)
}

// ============================================================================
// Sheet builder
// ============================================================================

/// One worksheet under construction, rows appended top to bottom.
pub struct SheetBuilder {
    sheet: Worksheet,
    formats: CellFormats,
    widths: ColumnWidths,
    next_row: u32,
}

impl std::fmt::Debug for SheetBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetBuilder")
            .field("widths", &self.widths)
            .field("next_row", &self.next_row)
            .finish_non_exhaustive()
    }
}

impl SheetBuilder {
    pub fn new(name: &str, formats: &CellFormats) -> Result<Self, XlsxError> {
        let mut sheet = Worksheet::new();
        sheet.set_name(name)?;
        Ok(Self {
            sheet,
            formats: formats.clone(),
            widths: ColumnWidths::default(),
            next_row: 0,
        })
    }

    /// Row the next write goes to.
    pub fn next_row(&self) -> u32 {
        self.next_row
    }

    fn widen(&mut self, col: u16, width: f64) -> Result<(), XlsxError> {
        if let Some(w) = self.widths.observe(col, width) {
            self.sheet.set_column_width(col, w)?;
        }
        Ok(())
    }

    /// Write the heading row. Long headings wrap instead of widening the column.
    pub fn write_headings<S: AsRef<str>>(&mut self, headings: &[S]) -> Result<(), XlsxError> {
        let row = self.next_row;
        for (col, heading) in (0_u16..).zip(headings) {
            let heading = heading.as_ref();
            let wrapped: String = heading.chars().take(HEADING_WRAP_LEN).collect();
            self.widen(col, text_width(&wrapped))?;
            self.sheet
                .write_string_with_format(row, col, heading, &self.formats.heading)?;
        }
        self.next_row += 1;
        Ok(())
    }

    fn write_cell(&mut self, row: u32, col: u16, cell: &Cell) -> Result<(), XlsxError> {
        match cell {
            Cell::Empty => return Ok(()),
            Cell::Timestamp(t) => {
                self.sheet
                    .write_datetime_with_format(row, col, t, &self.formats.datetime)?;
            }
            Cell::Number { value, places } => {
                let format = self.formats.number(*places).clone();
                self.sheet.write_number_with_format(row, col, *value, &format)?;
            }
            Cell::Text(text) => {
                self.sheet.write_string(row, col, text)?;
            }
        }
        self.widen(col, cell_width(cell))
    }

    /// Append one row of typed cells.
    pub fn write_cells(&mut self, cells: &[Cell]) -> Result<(), XlsxError> {
        let row = self.next_row;
        for (col, cell) in (0_u16..).zip(cells) {
            self.write_cell(row, col, cell)?;
        }
        self.next_row += 1;
        Ok(())
    }

    fn write_marker(&mut self, row: u32, col: u16, text: &str) -> Result<(), XlsxError> {
        self.sheet.write_string_with_format(row, col, text, &self.formats.wrap)?;
        self.widen(col, text_width(text))
    }

    /// `<start epoch> | Start`
    pub fn write_window_start(&mut self, window: &VisibilityWindow) -> Result<(), XlsxError> {
        let row = self.next_row;
        self.write_cell(row, 0, &Cell::Timestamp(window.start))?;
        self.write_marker(row, 1, "Start")?;
        self.next_row += 1;
        Ok(())
    }

    /// `<stop epoch> | Stop | Duration: | <seconds> | secs`
    pub fn write_window_stop(&mut self, window: &VisibilityWindow) -> Result<(), XlsxError> {
        let row = self.next_row;
        self.write_cell(row, 0, &Cell::Timestamp(window.stop))?;
        self.write_marker(row, 1, "Stop")?;
        self.write_marker(row, 2, "Duration:")?;
        let duration = match window.duration.trim().parse::<f64>() {
            Ok(value) => Cell::Number { value, places: 2 },
            Err(_) => Cell::Text(window.duration.clone()),
        };
        self.write_cell(row, 3, &duration)?;
        self.write_marker(row, 4, "secs")?;
        self.next_row += 1;
        Ok(())
    }

    /// Append a correlated link row followed by one formula per derived
    /// column, starting at column `derived_col`.
    ///
    /// Formula results are cached in the cell so readers without a calculation
    /// engine see the values.
    pub fn write_correlated_row(
        &mut self,
        selected: &SelectedRow<'_>,
        offsets: [usize; 3],
        derived_col: u16,
        columns: &DerivedColumns,
    ) -> Result<(), XlsxError> {
        let row = self.next_row;
        for (col, cell) in (0_u16..).zip(&selected.row.cells) {
            self.write_cell(row, col, cell)?;
        }

        if let Some(offset) = selected.offset {
            let excel_row = row + 1;
            let [x, y, z] = offsets.map(|c| {
                format!("{}{excel_row}", column_number_to_name(u16::try_from(c).unwrap_or(u16::MAX)))
            });
            for (col, column) in (derived_col..).zip(columns.iter()) {
                let value = column.value(offset);
                let formula = Formula::new(column.formula(&x, &y, &z)).set_result(format!("{value:.4}"));
                self.sheet
                    .write_formula_with_format(row, col, formula, &self.formats.four_places)?;
                self.widen(col, FORMULA_COLUMN_WIDTH)?;
            }
        }
        self.next_row += 1;
        Ok(())
    }

    /// Freeze the heading row and epoch column and hand back the sheet.
    pub fn finish(mut self) -> Result<Worksheet, XlsxError> {
        self.sheet.set_freeze_panes(1, 1)?;
        Ok(self.sheet)
    }
}

/// Headings of a correlated sheet: the link report headings plus the derived ones.
pub fn correlated_headings(link_headings: &[String], columns: &DerivedColumns) -> Vec<String> {
    link_headings
        .iter()
        .cloned()
        .chain(columns.headings().map(str::to_string))
        .collect()
}

// ============================================================================
// Workbook
// ============================================================================

/// A workbook assembled sheet by sheet and saved once.
pub struct WorkbookEmitter {
    workbook: Workbook,
    formats: CellFormats,
    names: Vec<String>,
}

impl std::fmt::Debug for WorkbookEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbookEmitter").field("sheets", &self.names).finish()
    }
}

impl Default for WorkbookEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookEmitter {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            formats: CellFormats::default(),
            names: Vec::new(),
        }
    }

    /// Start a sheet named after `raw`, made valid and unique.
    pub fn sheet(&mut self, raw: &str) -> Result<SheetBuilder, XlsxError> {
        let name = sheet_name(raw, &self.names);
        self.names.push(name.clone());
        SheetBuilder::new(&name, &self.formats)
    }

    /// Add a finished sheet.
    pub fn push(&mut self, sheet: SheetBuilder) -> Result<(), XlsxError> {
        let sheet = sheet.finish()?;
        self.workbook.push_worksheet(sheet);
        Ok(())
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.names
    }

    /// Write the workbook to `path`.
    pub fn save(mut self, path: &Path) -> Result<(), ReportError> {
        self.workbook
            .save(path)
            .map_err(|e| ReportError::workbook(path, e))?;
        info!(path = %path.display(), sheets = self.names.len(), "Workbook written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_name_sanitized_and_truncated() {
        assert_eq!(sheet_name("North/East", &[]), "North_East");
        let long = "A".repeat(40);
        assert_eq!(sheet_name(&long, &[]).len(), 31);
        assert_eq!(sheet_name("  ", &[]), "Sheet");
    }

    #[test]
    fn test_sheet_name_deduplicated() {
        let taken = vec!["North".to_string(), "north_2".to_string()];
        assert_eq!(sheet_name("NORTH", &taken), "NORTH_3");
    }

    #[test]
    fn test_column_widths_only_grow() {
        let mut widths = ColumnWidths::default();
        assert_eq!(widths.observe(2, 8.0), Some(8.0));
        assert_eq!(widths.observe(2, 5.0), None);
        assert_eq!(widths.observe(2, 500.0), Some(MAX_COLUMN_WIDTH));
        assert_eq!(widths.get(0), Some(0.0));
        assert_eq!(widths.get(9), None);
    }

    #[test]
    fn test_correlated_headings_append_derived() {
        let headings = correlated_headings(&["Sat1.A1Gregorian".to_string()], &DerivedColumns::default());
        assert_eq!(
            headings,
            vec!["Sat1.A1Gregorian", "Slant.Range.(km)", "Azimuth.(deg)", "Elevation.(deg)"]
        );
    }

    #[test]
    fn test_sheet_builder_debug_skips_worksheet() {
        let mut emitter = WorkbookEmitter::new();
        let mut sheet = emitter.sheet("North").unwrap();
        sheet.write_headings(&["Sat1.A1Gregorian"]).unwrap();
        let shown = format!("{sheet:?}");
        assert!(shown.starts_with("SheetBuilder"));
        assert!(shown.contains("next_row: 1"));
    }

    #[test]
    fn test_emitter_rejects_nothing_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut emitter = WorkbookEmitter::new();
        let mut sheet = emitter.sheet("Report").unwrap();
        sheet.write_headings(&["Name", "Value"]).unwrap();
        sheet
            .write_cells(&[Cell::Text("SMA".into()), Cell::Number { value: 7000.0, places: 4 }])
            .unwrap();
        assert_eq!(sheet.next_row(), 2);
        emitter.push(sheet).unwrap();
        emitter.save(&path).unwrap();
        assert!(path.exists());
    }
}
