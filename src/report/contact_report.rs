//! Contact report builder
//!
//! Joins the windows of one contact locator report with the link tables
//! registered for their correlation keys and writes one workbook per input,
//! one sheet per area of interest. A window whose link data is missing or
//! unusable is skipped with a warning; the rest of the report is still written.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use super::batch::BatchSummary;
use super::emitter::{correlated_headings, SheetBuilder, WorkbookEmitter};
use super::link_table::LinkLookup;
use super::output::{resolve_output_path, workbook_path_for};
use super::selector::{select, DerivedColumns, LinkCache};
use super::windows::extract_windows;
use super::ReportError;
use crate::config::ReportsConfig;
use crate::types::{LinkTable, VisibilityWindow};

/// What was written for one contact report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactSummary {
    pub input: PathBuf,
    /// `None` when an existing output was kept or there was nothing to write.
    pub output: Option<PathBuf>,
    pub sheets: usize,
    pub windows_written: usize,
    pub windows_skipped: usize,
    pub rows_written: usize,
}

fn write_window(
    sheet: &mut SheetBuilder,
    window: &VisibilityWindow,
    table: &LinkTable,
    columns: &DerivedColumns,
) -> Result<usize, rust_xlsxwriter::XlsxError> {
    let selection = select(window, table);
    let derived_col = u16::try_from(table.headings().len()).unwrap_or(u16::MAX);
    sheet.write_window_start(window)?;
    for selected in &selection.rows {
        sheet.write_correlated_row(selected, table.offset_columns(), derived_col, columns)?;
    }
    sheet.write_window_stop(window)?;
    Ok(selection.rows.len())
}

/// Build the contact workbook for the report at `path` with slant range,
/// azimuth and elevation columns.
pub fn build_contact_report(
    path: &Path,
    lookup: &LinkLookup,
    config: &ReportsConfig,
) -> Result<ContactSummary, ReportError> {
    build_contact_report_with(path, lookup, config, &DerivedColumns::default())
}

/// Build the contact workbook for the report at `path`, appending `columns`
/// to every correlated row.
pub fn build_contact_report_with(
    path: &Path,
    lookup: &LinkLookup,
    config: &ReportsConfig,
    columns: &DerivedColumns,
) -> Result<ContactSummary, ReportError> {
    let mut summary = ContactSummary {
        input: path.to_path_buf(),
        ..ContactSummary::default()
    };
    let Some(out) = resolve_output_path(&workbook_path_for(path), config.existing_output) else {
        return Ok(summary);
    };

    let report = extract_windows(path, config.unterminated_section)?;
    if report.areas.is_empty() {
        warn!(path = %path.display(), "Contact report has no observer sections, nothing to write");
        return Ok(summary);
    }

    let mut cache = LinkCache::new(lookup, config.offset_columns);
    let mut emitter = WorkbookEmitter::new();
    let as_report_error = |e| ReportError::workbook(&out, e);

    for area in &report.areas {
        let mut sheet = emitter.sheet(area).map_err(as_report_error)?;
        let mut headings_written = false;

        for (key, windows) in report.windows.iter().filter(|(k, _)| &k.area_id == area) {
            let Some(table) = cache.table_for(key) else {
                summary.windows_skipped += windows.len();
                continue;
            };
            if !headings_written {
                sheet
                    .write_headings(&correlated_headings(table.headings(), columns))
                    .map_err(as_report_error)?;
                headings_written = true;
            }
            for window in windows {
                summary.rows_written += write_window(&mut sheet, window, &table, columns).map_err(as_report_error)?;
                summary.windows_written += 1;
            }
        }

        emitter.push(sheet).map_err(as_report_error)?;
        summary.sheets += 1;
    }

    emitter.save(&out)?;
    info!(
        input = %path.display(),
        output = %out.display(),
        sheets = summary.sheets,
        windows = summary.windows_written,
        skipped = summary.windows_skipped,
        "✓ Contact report written"
    );
    summary.output = Some(out);
    Ok(summary)
}

/// Build a contact workbook for every report in `paths`.
pub fn build_contact_reports(
    paths: &[PathBuf],
    lookup: &LinkLookup,
    config: &ReportsConfig,
) -> (Vec<ContactSummary>, BatchSummary) {
    build_contact_reports_with(paths, lookup, config, &DerivedColumns::default())
}

pub fn build_contact_reports_with(
    paths: &[PathBuf],
    lookup: &LinkLookup,
    config: &ReportsConfig,
    columns: &DerivedColumns,
) -> (Vec<ContactSummary>, BatchSummary) {
    let mut contacts = Vec::with_capacity(paths.len());
    let mut summary = BatchSummary::default();
    for (i, path) in paths.iter().enumerate() {
        match build_contact_report_with(path, lookup, config, columns) {
            Ok(contact) => {
                if contact.output.is_some() {
                    summary.record_success();
                } else {
                    summary.record_skip();
                }
                contacts.push(contact);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Contact report failed");
                summary.record_failure(path, e.to_string());
            }
        }
        info!("Completed {} of {} contact reports", i + 1, paths.len());
    }
    (contacts, summary)
}
