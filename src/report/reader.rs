//! Tabular reader: parses a normalized report into a `DelimitedTable`

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use super::ReportError;
use crate::types::DelimitedTable;

/// Read a normalized delimited file.
///
/// Rows are keyed by zero-based line number; every field is trimmed.
/// An empty file gives an empty table.
pub fn read_table(path: &Path) -> Result<DelimitedTable, ReportError> {
    let file = std::fs::File::open(path).map_err(|e| ReportError::io(path, e))?;
    parse_table(file, path)
}

/// Parse delimited text from any reader. `path` is only used in errors.
pub fn parse_table<R: Read>(input: R, path: &Path) -> Result<DelimitedTable, ReportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let mut table = DelimitedTable::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|source| ReportError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let row = record
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .map_or(i, |line| line.saturating_sub(1));
        table.insert(row, record.iter().map(str::to_string).collect());
    }
    Ok(table)
}
