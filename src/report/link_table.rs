//! Link report lookup and loading
//!
//! Link reports are processed before any contact report. Each one registers its
//! correlation key here together with the file holding its data, either the
//! formatted workbook (sheet `Report`) or the raw GMAT text.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{DurationRound, NaiveDateTime, TimeDelta};
use tracing::{debug, warn};

use super::classifier::{
    analyze_link_headings, classify_table, link_table_from_rows, FormattedReport, LinkClassifier,
    LinkReport,
};
use super::timestamp::classify_cell;
use super::{normalize_file, read_table, ReportError};
use crate::config::defaults::REPORT_SHEET_NAME;
use crate::types::{Cell, CorrelationKey, LinkTable};

// ============================================================================
// Lookup
// ============================================================================

/// Correlation key to link report file, built while link reports are processed.
#[derive(Debug, Clone, Default)]
pub struct LinkLookup {
    entries: BTreeMap<CorrelationKey, PathBuf>,
}

impl LinkLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` for `key`. A key already present is re-pointed with a warning.
    pub fn register(&mut self, key: CorrelationKey, path: PathBuf) {
        if let Some(previous) = self.entries.get(&key) {
            if previous != &path {
                warn!(
                    key = %key,
                    previous = %previous.display(),
                    replacement = %path.display(),
                    "Correlation key registered twice, keeping the later link report"
                );
            }
        }
        self.entries.insert(key, path);
    }

    pub fn get(&self, key: &CorrelationKey) -> Option<&Path> {
        self.entries.get(key).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CorrelationKey, &Path)> {
        self.entries.iter().map(|(k, p)| (k, p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Whether `path` names a spreadsheet rather than report text.
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "xlsx" | "xlsm" | "xls" | "ods"))
}

/// Load and classify a link report from a workbook or from GMAT text.
pub fn load_link_report(path: &Path, fallback_offsets: [usize; 3]) -> Result<LinkReport, ReportError> {
    if is_workbook(path) {
        load_link_workbook(path, fallback_offsets)
    } else {
        let table = {
            let normalized = normalize_file(path)?;
            read_table(normalized.path())?
        };
        classify_table(&table, LinkClassifier::new(path, fallback_offsets))
    }
}

/// Load only the time-ordered table of a link report.
pub fn load_link_table(path: &Path, fallback_offsets: [usize; 3]) -> Result<LinkTable, ReportError> {
    load_link_report(path, fallback_offsets).map(|link| link.table)
}

/// Excel stores epochs as day fractions; snap back to GMAT's millisecond grid.
fn snap_to_millis(t: NaiveDateTime) -> NaiveDateTime {
    t.duration_round(TimeDelta::milliseconds(1)).unwrap_or(t)
}

#[allow(clippy::cast_precision_loss)]
fn cell_from_data(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::Float(value) => Cell::Number { value: *value, places: 4 },
        Data::Int(value) => Cell::Number { value: *value as f64, places: 2 },
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map_or(Cell::Empty, |t| Cell::Timestamp(snap_to_millis(t))),
        Data::String(text) => classify_cell(text),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DurationIso(text) => Cell::Text(text.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

/// Read the `Report` sheet of a formatted link workbook.
///
/// The workbook is opened, read into memory and closed before this returns.
pub fn load_link_workbook(path: &Path, fallback_offsets: [usize; 3]) -> Result<LinkReport, ReportError> {
    let range = {
        let mut workbook = open_workbook_auto(path).map_err(|source| ReportError::Spreadsheet {
            path: path.to_path_buf(),
            source,
        })?;
        workbook
            .worksheet_range(REPORT_SHEET_NAME)
            .map_err(|source| ReportError::Spreadsheet {
                path: path.to_path_buf(),
                source,
            })?
    };

    let mut rows = range.rows();
    let headings: Vec<String> = rows
        .next()
        .ok_or_else(|| ReportError::validation(path, format!("sheet '{REPORT_SHEET_NAME}' is empty")))?
        .iter()
        .map(|c| c.to_string().trim().to_string())
        .collect();
    let data: Vec<Vec<Cell>> = rows
        .map(|r| r.iter().map(cell_from_data).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| *c != Cell::Empty))
        .collect();

    let analysis = analyze_link_headings(&headings, fallback_offsets)
        .map_err(|reason| ReportError::validation(path, reason))?;
    let table = link_table_from_rows(headings.clone(), &data, analysis.offset_columns)
        .map_err(|reason| ReportError::validation(path, reason))?;
    debug!(path = %path.display(), key = %analysis.key, rows = table.len(), "Link workbook loaded");

    Ok(LinkReport {
        key: analysis.key,
        report: FormattedReport { headings, rows: data },
        table,
    })
}
