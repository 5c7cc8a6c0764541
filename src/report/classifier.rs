//! Report classifiers: turn a `DelimitedTable` into structured report data
//!
//! A classifier is fed one non-empty field at a time, in row then column order,
//! with an `end_row` call after each row and a final `finish` at end of input.
//! Three variants exist:
//!
//! - [`VisibilityClassifier`]: the contact locator state machine producing a
//!   `TimeWindowMap`
//! - [`LinkClassifier`]: a heading row naming asset, area and X/Y/Z columns,
//!   followed by time-ordered data rows
//! - [`ReportClassifier`]: any GMAT report with a heading row, typed cell by cell

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, info, warn};

use super::timestamp::{classify_cell, format_gmat_time, parse_gmat_time};
use super::ReportError;
use crate::config::UnterminatedSection;
use crate::types::{
    Cell, CorrelationKey, DelimitedTable, LinkRow, LinkTable, TimeWindowMap, VisibilityWindow,
};

// ============================================================================
// Capability
// ============================================================================

/// Field-by-field consumer of a parsed report.
pub trait RowClassifier {
    type Output;

    /// Inspect one non-empty field.
    fn classify_field(&mut self, row: usize, col: usize, field: &str) -> Result<(), ReportError>;

    /// Called after the last field of each row.
    fn end_row(&mut self, _row: usize) -> Result<(), ReportError> {
        Ok(())
    }

    /// End of input.
    fn finish(self) -> Result<Self::Output, ReportError>;
}

/// Drive `classifier` over every field of `table`.
pub fn classify_table<C: RowClassifier>(
    table: &DelimitedTable,
    mut classifier: C,
) -> Result<C::Output, ReportError> {
    for (row, fields) in table.iter() {
        for (col, field) in fields.iter().enumerate() {
            let field = field.trim_matches(['\r', '\n']);
            if field.is_empty() {
                continue;
            }
            classifier.classify_field(row, col, field)?;
        }
        classifier.end_row(row)?;
    }
    classifier.finish()
}

// ============================================================================
// Identifier patterns
// ============================================================================

#[allow(clippy::expect_used)]
fn satellite_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[sS]at(\d*)").expect("static pattern"))
}

#[allow(clippy::expect_used)]
fn area_prefix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z][A-Za-z]+_").expect("static pattern"))
}

#[allow(clippy::expect_used)]
fn target_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Target:\s*").expect("static pattern"))
}

#[allow(clippy::expect_used)]
fn observer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Observer:\s*").expect("static pattern"))
}

/// Normalize a satellite name and extract its number.
///
/// `LEOsat` becomes `LEOsat1`: a trailing `sat` without digits means satellite 1.
/// Returns `None` when the text has no `sat` token.
pub fn normalize_asset_id(text: &str) -> Option<(String, u32)> {
    let text = text.trim();
    let caps = satellite_pattern().captures(text)?;
    let whole = caps.get(0)?;
    let digits = caps.get(1).map_or("", |m| m.as_str());
    if digits.is_empty() {
        let asset = if whole.end() == text.len() {
            format!("{text}1")
        } else {
            text.to_string()
        };
        Some((asset, 1))
    } else {
        Some((text.to_string(), digits.parse().ok()?))
    }
}

/// Satellite number named by a report file, from its last `sat<digits>` token.
pub fn satellite_number_in_filename(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let caps = satellite_pattern().captures_iter(stem).last()?;
    let digits = caps.get(1).map_or("", |m| m.as_str());
    if digits.is_empty() {
        Some(1)
    } else {
        digits.parse().ok()
    }
}

/// Area id: the text after a capitalized-word-plus-underscore prefix.
///
/// `AOI_North` gives `North`. `None` when there is no such prefix or nothing follows it.
pub fn area_id_from_observer(text: &str) -> Option<String> {
    let m = area_prefix_pattern().find(text)?;
    let area = text[m.end()..].trim();
    (!area.is_empty()).then(|| area.to_string())
}

// ============================================================================
// Visibility (Contact Locator) Classifier
// ============================================================================

/// Position of the visibility classifier in a contact locator report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    /// No `Target:` seen yet.
    AwaitingTarget,
    /// Asset known, waiting for `Observer:`.
    AwaitingObserver,
    /// Section open, looking for the two `UTC` heading columns.
    AwaitingTimeColumns,
    /// Columns bound, reading start/stop/duration rows.
    CollectingWindows,
}

/// Windows extracted from one contact locator report.
#[derive(Debug, Clone, Default)]
pub struct VisibilityReport {
    pub windows: TimeWindowMap,
    /// Area ids in the order their `Observer:` sections appeared; one sheet each.
    pub areas: Vec<String>,
    /// Windows dropped because their section was never terminated.
    pub discarded: usize,
}

/// Explicit state machine over a contact locator report.
///
/// Recognized markers, tested in this order for every field:
/// `Target:` (new asset), `Observer:` (new area section), `UTC` headings
/// (start then stop column), `Duration` heading, GMAT epochs in the bound
/// columns, the duration value, and `Number of events` which commits the section.
#[derive(Debug)]
pub struct VisibilityClassifier {
    source: PathBuf,
    unterminated: UnterminatedSection,
    state: VisibilityState,
    asset_id: Option<String>,
    key: Option<CorrelationKey>,
    start_col: Option<usize>,
    stop_col: Option<usize>,
    duration_col: Option<usize>,
    pending_start: Option<NaiveDateTime>,
    pending_stop: Option<NaiveDateTime>,
    open: Vec<VisibilityWindow>,
    report: VisibilityReport,
}

impl VisibilityClassifier {
    /// `source` is the report file; its name is cross-checked against `Target:`.
    pub fn new(source: &Path, unterminated: UnterminatedSection) -> Self {
        Self {
            source: source.to_path_buf(),
            unterminated,
            state: VisibilityState::AwaitingTarget,
            asset_id: None,
            key: None,
            start_col: None,
            stop_col: None,
            duration_col: None,
            pending_start: None,
            pending_stop: None,
            open: Vec::new(),
            report: VisibilityReport::default(),
        }
    }

    pub fn state(&self) -> VisibilityState {
        self.state
    }

    fn invalid(&self, reason: impl Into<String>) -> ReportError {
        ReportError::validation(&self.source, reason)
    }

    fn reset_columns(&mut self) {
        self.start_col = None;
        self.stop_col = None;
        self.duration_col = None;
        self.pending_start = None;
        self.pending_stop = None;
    }

    /// Deal with windows of a section that ended without `Number of events`.
    fn close_unterminated(&mut self) {
        if self.open.is_empty() {
            return;
        }
        let windows = std::mem::take(&mut self.open);
        let Some(key) = self.key.clone() else {
            return;
        };
        match self.unterminated {
            UnterminatedSection::Flush => {
                info!(key = %key, windows = windows.len(), "Flushing unterminated visibility section");
                self.report.windows.commit(key, windows);
            }
            UnterminatedSection::Discard => {
                warn!(
                    path = %self.source.display(),
                    key = %key,
                    windows = windows.len(),
                    "Visibility section has no 'Number of events' marker, discarding its windows"
                );
                self.report.discarded += windows.len();
            }
        }
    }

    fn on_target(&mut self, row: usize, remainder: &str) -> Result<(), ReportError> {
        let Some((asset_id, target_sat)) = normalize_asset_id(remainder) else {
            return Err(self.invalid(format!(
                "row {row}: no recognizable satellite number in target '{remainder}'"
            )));
        };
        let Some(file_sat) = satellite_number_in_filename(&self.source) else {
            return Err(self.invalid("no satellite number in file name"));
        };
        if file_sat != target_sat {
            return Err(self.invalid(format!(
                "satellite number in file name (sat{file_sat}) does not match target '{remainder}' (sat{target_sat})"
            )));
        }

        self.close_unterminated();
        self.reset_columns();
        self.key = None;
        debug!(asset = %asset_id, row, "Target section");
        self.asset_id = Some(asset_id);
        self.state = VisibilityState::AwaitingObserver;
        Ok(())
    }

    fn on_observer(&mut self, row: usize, remainder: &str) -> Result<(), ReportError> {
        let Some(asset_id) = self.asset_id.clone() else {
            return Err(self.invalid(format!("row {row}: 'Observer:' before any 'Target:'")));
        };
        let Some(area_id) = area_id_from_observer(remainder) else {
            return Err(self.invalid(format!(
                "row {row}: observer '{remainder}' does not contain an area id"
            )));
        };

        self.close_unterminated();
        self.reset_columns();
        let key = CorrelationKey::new(asset_id, area_id.clone())
            .map_err(|e| ReportError::record(&self.source, &e))?;
        debug!(key = %key, row, "Observer section");
        if !self.report.areas.contains(&area_id) {
            self.report.areas.push(area_id);
        }
        self.key = Some(key);
        self.state = VisibilityState::AwaitingTimeColumns;
        Ok(())
    }

    /// Complete the pending window once both epochs are known.
    fn push_window(&mut self, row: usize, duration: Option<&str>) -> Result<(), ReportError> {
        let (Some(start), Some(stop), Some(key)) =
            (self.pending_start.take(), self.pending_stop.take(), self.key.clone())
        else {
            return Ok(());
        };
        let probe = VisibilityWindow::new(key, start, stop, String::new())
            .map_err(|e| self.invalid(format!("row {row}: {e}")))?;
        let duration = duration.map_or_else(|| format!("{:.4}", probe.elapsed_secs()), str::to_string);
        self.open.push(VisibilityWindow { duration, ..probe });
        Ok(())
    }

    fn on_time(&mut self, row: usize, col: usize, field: &str, t: NaiveDateTime) -> Result<(), ReportError> {
        if self.state != VisibilityState::CollectingWindows {
            debug!(row, col, "Epoch outside a window table, ignored");
            return Ok(());
        }
        if Some(col) == self.start_col {
            self.pending_start = Some(t);
            Ok(())
        } else if Some(col) == self.stop_col {
            self.pending_stop = Some(t);
            Ok(())
        } else {
            Err(self.invalid(format!(
                "row {row}: unexpected epoch '{field}' in column {col}"
            )))
        }
    }
}

impl RowClassifier for VisibilityClassifier {
    type Output = VisibilityReport;

    fn classify_field(&mut self, row: usize, col: usize, field: &str) -> Result<(), ReportError> {
        if let Some(m) = target_pattern().find(field) {
            return self.on_target(row, &field[m.end()..]);
        }
        if let Some(m) = observer_pattern().find(field) {
            return self.on_observer(row, &field[m.end()..]);
        }

        if field.contains("UTC") && self.state == VisibilityState::AwaitingTimeColumns {
            if self.start_col.is_none() {
                self.start_col = Some(col);
            } else {
                self.stop_col = Some(col);
                self.state = VisibilityState::CollectingWindows;
            }
            return Ok(());
        }

        if field.contains("Duration")
            && self.state == VisibilityState::CollectingWindows
            && self.duration_col.is_none()
        {
            self.duration_col = Some(col);
            return Ok(());
        }

        if let Some(t) = parse_gmat_time(field) {
            return self.on_time(row, col, field, t);
        }

        if self.state == VisibilityState::CollectingWindows
            && Some(col) == self.duration_col
            && self.pending_start.is_some()
            && self.pending_stop.is_some()
        {
            return self.push_window(row, Some(field));
        }

        if field.starts_with("Number of events") {
            if let Some(key) = self.key.clone() {
                let windows = std::mem::take(&mut self.open);
                debug!(key = %key, windows = windows.len(), "Section committed");
                if !windows.is_empty() {
                    self.report.windows.commit(key, windows);
                }
            }
            self.reset_columns();
            if self.state != VisibilityState::AwaitingTarget {
                self.state = VisibilityState::AwaitingObserver;
            }
        }
        Ok(())
    }

    fn end_row(&mut self, row: usize) -> Result<(), ReportError> {
        if self.pending_start.is_some() && self.pending_stop.is_some() {
            // No duration column value on this row: derive it from the epochs.
            self.push_window(row, None)?;
        } else if self.pending_start.take().is_some() || self.pending_stop.take().is_some() {
            warn!(path = %self.source.display(), row, "Window row without both start and stop epochs, ignored");
        }
        Ok(())
    }

    fn finish(mut self) -> Result<VisibilityReport, ReportError> {
        if self.state == VisibilityState::AwaitingTarget {
            return Err(self.invalid("no 'Target:' marker found"));
        }
        self.close_unterminated();
        Ok(self.report)
    }
}

// ============================================================================
// Generic Report Classifier
// ============================================================================

/// A GMAT report typed cell by cell, first row as headings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedReport {
    pub headings: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Types every field of a report whose first row holds the headings.
#[derive(Debug, Default)]
pub struct ReportClassifier {
    heading_row: Option<usize>,
    report: FormattedReport,
    current: Vec<Cell>,
}

impl ReportClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowClassifier for ReportClassifier {
    type Output = FormattedReport;

    fn classify_field(&mut self, row: usize, col: usize, field: &str) -> Result<(), ReportError> {
        let heading_row = *self.heading_row.get_or_insert(row);
        if row == heading_row {
            if self.report.headings.len() <= col {
                self.report.headings.resize(col + 1, String::new());
            }
            self.report.headings[col] = field.to_string();
        } else {
            if self.current.len() <= col {
                self.current.resize(col + 1, Cell::Empty);
            }
            self.current[col] = classify_cell(field);
        }
        Ok(())
    }

    fn end_row(&mut self, _row: usize) -> Result<(), ReportError> {
        if !self.current.is_empty() {
            self.report.rows.push(std::mem::take(&mut self.current));
        }
        Ok(())
    }

    fn finish(self) -> Result<FormattedReport, ReportError> {
        Ok(self.report)
    }
}

// ============================================================================
// Link Report Classifier
// ============================================================================

/// What a link report heading row says about its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHeadings {
    pub key: CorrelationKey,
    pub offset_columns: [usize; 3],
}

/// Components of a heading, split on `.` and spaces.
fn heading_components(heading: &str) -> Vec<&str> {
    heading.split(['.', ' ']).filter(|c| !c.is_empty()).collect()
}

/// Analyze a link report heading row.
///
/// Column 0 must be the `A1Gregorian` epoch; its first component names the asset.
/// Headings ending in an `X`, `Y` or `Z` component are the offset columns, and the
/// component before `X` names the area (prefix such as `AOI_` stripped). Axes not
/// found in the headings fall back to `fallback`.
pub fn analyze_link_headings(
    headings: &[String],
    fallback: [usize; 3],
) -> Result<LinkHeadings, String> {
    let first = headings.first().map(String::as_str).unwrap_or_default();
    if !first.contains("A1Gregorian") {
        return Err(format!(
            "row 0 column 0 heading '{first}' is not an A1Gregorian epoch"
        ));
    }
    let asset_text = heading_components(first).first().copied().unwrap_or_default();
    let (asset_id, _) = normalize_asset_id(asset_text)
        .ok_or_else(|| format!("no satellite name in epoch heading '{first}'"))?;

    let mut found: [Option<usize>; 3] = [None; 3];
    let mut area_id: Option<String> = None;
    for (col, heading) in headings.iter().enumerate().skip(1) {
        let parts = heading_components(heading);
        let axis = match parts.last() {
            Some(&"X") => 0,
            Some(&"Y") => 1,
            Some(&"Z") => 2,
            _ => continue,
        };
        if found[axis].is_some() {
            continue;
        }
        found[axis] = Some(col);
        if axis == 0 && parts.len() >= 2 {
            let component = parts[parts.len() - 2];
            area_id = Some(area_id_from_observer(component).unwrap_or_else(|| component.to_string()));
        }
    }

    let area_id = area_id.ok_or_else(|| "no '<area>.X' offset heading found".to_string())?;
    let key = CorrelationKey::new(asset_id, area_id).map_err(|e| e.to_string())?;
    let offset_columns = [0, 1, 2].map(|axis| found[axis].unwrap_or(fallback[axis]));
    Ok(LinkHeadings { key, offset_columns })
}

/// Build the time-ordered table from typed report rows.
pub fn link_table_from_rows(
    headings: Vec<String>,
    rows: &[Vec<Cell>],
    offset_columns: [usize; 3],
) -> Result<LinkTable, String> {
    let mut link_rows = Vec::with_capacity(rows.len());
    for (i, cells) in rows.iter().enumerate() {
        let Some(timestamp) = cells.first().and_then(Cell::as_timestamp) else {
            return Err(format!("data row {} column 0 is not a GMAT epoch", i + 1));
        };
        link_rows.push(LinkRow {
            timestamp,
            cells: cells.clone(),
        });
    }
    LinkTable::new(headings, link_rows, offset_columns).map_err(|e| e.to_string())
}

/// A classified link report.
#[derive(Debug, Clone)]
pub struct LinkReport {
    pub key: CorrelationKey,
    pub report: FormattedReport,
    pub table: LinkTable,
}

/// Generic typing plus the link heading rules.
#[derive(Debug)]
pub struct LinkClassifier {
    source: PathBuf,
    fallback_offsets: [usize; 3],
    inner: ReportClassifier,
}

impl LinkClassifier {
    pub fn new(source: &Path, fallback_offsets: [usize; 3]) -> Self {
        Self {
            source: source.to_path_buf(),
            fallback_offsets,
            inner: ReportClassifier::new(),
        }
    }
}

impl RowClassifier for LinkClassifier {
    type Output = LinkReport;

    fn classify_field(&mut self, row: usize, col: usize, field: &str) -> Result<(), ReportError> {
        self.inner.classify_field(row, col, field)
    }

    fn end_row(&mut self, row: usize) -> Result<(), ReportError> {
        self.inner.end_row(row)
    }

    fn finish(self) -> Result<LinkReport, ReportError> {
        let report = self.inner.finish()?;
        let headings = analyze_link_headings(&report.headings, self.fallback_offsets)
            .map_err(|reason| ReportError::validation(&self.source, reason))?;
        let table = link_table_from_rows(report.headings.clone(), &report.rows, headings.offset_columns)
            .map_err(|reason| ReportError::validation(&self.source, reason))?;
        debug!(
            key = %headings.key,
            rows = table.len(),
            first = %table.rows().first().map(|r| format_gmat_time(&r.timestamp)).unwrap_or_default(),
            "Link report classified"
        );
        Ok(LinkReport {
            key: headings.key,
            report,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{normalize_text, parse_table};

    fn table(text: &str) -> DelimitedTable {
        parse_table(normalize_text(text).as_bytes(), Path::new("t.csv")).unwrap()
    }

    const CONTACTS: &str = "\
Target: Sat1

Observer: AOI_North
Start Time (UTC)            Stop Time (UTC)               Duration (s)
01 Jan 2024 00:00:00.000    01 Jan 2024 00:10:00.000      600.0000
01 Jan 2024 01:30:00.000    01 Jan 2024 01:35:30.000      330.0000

Number of events : 2

Observer: AOI_South
Start Time (UTC)            Stop Time (UTC)               Duration (s)
01 Jan 2024 02:00:00.000    01 Jan 2024 02:01:00.000      60.0000

Number of events : 1
";

    fn classify_contacts(text: &str, file: &str) -> Result<VisibilityReport, ReportError> {
        classify_table(
            &table(text),
            VisibilityClassifier::new(Path::new(file), UnterminatedSection::Discard),
        )
    }

    #[test]
    fn test_normalize_asset_id() {
        assert_eq!(normalize_asset_id("Sat1"), Some(("Sat1".to_string(), 1)));
        assert_eq!(normalize_asset_id("LEOsat"), Some(("LEOsat1".to_string(), 1)));
        assert_eq!(normalize_asset_id("LEOsat12"), Some(("LEOsat12".to_string(), 12)));
        assert_eq!(normalize_asset_id("GroundStation"), None);
    }

    #[test]
    fn test_satellite_number_in_filename() {
        assert_eq!(satellite_number_in_filename(Path::new("/r/SIGHTLocator_Sat2.txt")), Some(2));
        assert_eq!(satellite_number_in_filename(Path::new("Contacts_LEOsat.txt")), Some(1));
        assert_eq!(satellite_number_in_filename(Path::new("Contacts.txt")), None);
    }

    #[test]
    fn test_area_id_from_observer() {
        assert_eq!(area_id_from_observer("AOI_North"), Some("North".to_string()));
        assert_eq!(area_id_from_observer("GroundStation_Wallops Island"), Some("Wallops Island".to_string()));
        assert_eq!(area_id_from_observer("north"), None);
        assert_eq!(area_id_from_observer("AOI_"), None);
    }

    #[test]
    fn test_visibility_sections_extracted() {
        let report = classify_contacts(CONTACTS, "SIGHTLocator_Sat1.txt").unwrap();
        assert_eq!(report.areas, vec!["North", "South"]);
        assert_eq!(report.windows.window_count(), 3);

        let north = CorrelationKey::new("Sat1", "North").unwrap();
        let windows = report.windows.get(&north).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(format_gmat_time(&windows[0].start), "01 Jan 2024 00:00:00.000");
        assert_eq!(format_gmat_time(&windows[1].stop), "01 Jan 2024 01:35:30.000");
        assert_eq!(windows[1].duration, "330.0000");
        assert_eq!(report.discarded, 0);
    }

    #[test]
    fn test_filename_mismatch_is_validation_error() {
        let err = classify_contacts(CONTACTS, "SIGHTLocator_Sat2.txt").unwrap_err();
        assert!(err.is_validation(), "got {err}");
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_observer_without_area_is_validation_error() {
        let text = "Target: Sat1\nObserver: north\n";
        let err = classify_contacts(text, "Sat1.txt").unwrap_err();
        assert!(err.to_string().contains("area id"));
    }

    #[test]
    fn test_missing_target_is_validation_error() {
        let err = classify_contacts("Observer: AOI_North\n", "Sat1.txt").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_unterminated_section_discarded_by_default() {
        let text = "Target: Sat1\nObserver: AOI_North\nStart Time (UTC)   Stop Time (UTC)   Duration (s)\n\
01 Jan 2024 00:00:00.000   01 Jan 2024 00:10:00.000   600.0000\n";
        let report = classify_contacts(text, "Sat1.txt").unwrap();
        assert!(report.windows.is_empty());
        assert_eq!(report.discarded, 1);
        assert_eq!(report.areas, vec!["North"]);
    }

    #[test]
    fn test_unterminated_section_flushed_when_configured() {
        let text = "Target: Sat1\nObserver: AOI_North\nStart Time (UTC)   Stop Time (UTC)   Duration (s)\n\
01 Jan 2024 00:00:00.000   01 Jan 2024 00:10:00.000   600.0000\n";
        let report = classify_table(
            &table(text),
            VisibilityClassifier::new(Path::new("Sat1.txt"), UnterminatedSection::Flush),
        )
        .unwrap();
        assert_eq!(report.windows.window_count(), 1);
        assert_eq!(report.discarded, 0);
    }

    #[test]
    fn test_duration_derived_without_duration_column() {
        let text = "Target: Sat1\nObserver: AOI_North\nStart Time (UTC)   Stop Time (UTC)\n\
01 Jan 2024 00:00:00.000   01 Jan 2024 00:01:30.000\nNumber of events : 1\n";
        let report = classify_contacts(text, "Sat1.txt").unwrap();
        let key = CorrelationKey::new("Sat1", "North").unwrap();
        assert_eq!(report.windows.get(&key).unwrap()[0].duration, "90.0000");
    }

    #[test]
    fn test_inverted_window_is_validation_error() {
        let text = "Target: Sat1\nObserver: AOI_North\nStart Time (UTC)   Stop Time (UTC)   Duration (s)\n\
01 Jan 2024 00:10:00.000   01 Jan 2024 00:00:00.000   600.0000\nNumber of events : 1\n";
        let err = classify_contacts(text, "Sat1.txt").unwrap_err();
        assert!(err.to_string().contains("precedes"));
    }

    #[test]
    fn test_state_transitions() {
        let mut c = VisibilityClassifier::new(Path::new("Sat1.txt"), UnterminatedSection::Discard);
        assert_eq!(c.state(), VisibilityState::AwaitingTarget);
        c.classify_field(0, 0, "Target: Sat1").unwrap();
        assert_eq!(c.state(), VisibilityState::AwaitingObserver);
        c.classify_field(1, 0, "Observer: AOI_North").unwrap();
        assert_eq!(c.state(), VisibilityState::AwaitingTimeColumns);
        c.classify_field(2, 0, "Start Time (UTC)").unwrap();
        c.classify_field(2, 1, "Stop Time (UTC)").unwrap();
        assert_eq!(c.state(), VisibilityState::CollectingWindows);
        c.classify_field(3, 0, "Number of events : 0").unwrap();
        assert_eq!(c.state(), VisibilityState::AwaitingObserver);
    }

    const LINK: &str = "\
Sat1.A1Gregorian            Sat1.Earth.Latitude   Sat1.Earth.Longitude   Sat1.Earth.Altitude   AOI_North.X   AOI_North.Y   AOI_North.Z
01 Jan 2024 00:00:00.000    12.5                  45.25                  500.123456            3.0000        4.0000        0.0000
01 Jan 2024 00:01:00.000    12.6                  45.35                  500.223456            3.5000        4.5000        0.5000
";

    #[test]
    fn test_link_headings_identify_key_and_offsets() {
        let link = classify_table(&table(LINK), LinkClassifier::new(Path::new("l.txt"), [4, 5, 6])).unwrap();
        assert_eq!(link.key.to_string(), "Sat1@North");
        assert_eq!(link.table.offset_columns(), [4, 5, 6]);
        assert_eq!(link.table.len(), 2);
        assert_eq!(link.table.rows()[0].offset([4, 5, 6]), Some([3.0, 4.0, 0.0]));
        assert_eq!(
            link.report.rows[0][1],
            Cell::Number { value: 12.5, places: 2 }
        );
        assert_eq!(
            link.report.rows[0][3],
            Cell::Number { value: 500.123_456, places: 4 }
        );
    }

    #[test]
    fn test_link_requires_a1gregorian() {
        let text = "Sat1.UTCGregorian   AOI_North.X\n01 Jan 2024 00:00:00.000   1.0\n";
        let err = classify_table(&table(text), LinkClassifier::new(Path::new("l.txt"), [1, 1, 1])).unwrap_err();
        assert!(err.to_string().contains("A1Gregorian"));
    }

    #[test]
    fn test_link_headings_offsets_follow_heading_positions() {
        let headings: Vec<String> = ["LEOsat.A1Gregorian", "Station_Goldstone X", "Station_Goldstone Y", "Station_Goldstone Z"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let h = analyze_link_headings(&headings, [4, 5, 6]).unwrap();
        assert_eq!(h.key.to_string(), "LEOsat1@Goldstone");
        assert_eq!(h.offset_columns, [1, 2, 3]);
    }

    #[test]
    fn test_generic_report_classifier_types_cells() {
        let text = "Sat1.UTCGregorian   Sat1.SMA   Sat1.Status\n01 Jan 2024 00:00:00.000   7000.12345   Nominal\n";
        let report = classify_table(&table(text), ReportClassifier::new()).unwrap();
        assert_eq!(report.headings.len(), 3);
        assert!(matches!(report.rows[0][0], Cell::Timestamp(_)));
        assert_eq!(report.rows[0][2], Cell::Text("Nominal".to_string()));
    }
}
