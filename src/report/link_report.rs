//! Link report formatter and generic report reducer
//!
//! Turns raw GMAT report text into a single-sheet workbook (`Report`) with
//! typed cells, and for link reports registers the result under its
//! correlation key for the contact report builder.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::batch::BatchSummary;
use super::classifier::{classify_table, FormattedReport, ReportClassifier};
use super::emitter::WorkbookEmitter;
use super::link_table::{is_workbook, load_link_report, LinkLookup};
use super::output::{resolve_output_path, workbook_path_for};
use super::{normalize_file, read_table, ReportError};
use crate::config::defaults::REPORT_SHEET_NAME;
use crate::config::{ExistingOutput, ReportsConfig};
use crate::types::CorrelationKey;

/// Write `report` as the `Report` sheet of a new workbook at `out`.
pub fn write_report_workbook(report: &FormattedReport, out: &Path) -> Result<(), ReportError> {
    let mut emitter = WorkbookEmitter::new();
    let mut sheet = emitter
        .sheet(REPORT_SHEET_NAME)
        .map_err(|e| ReportError::workbook(out, e))?;
    sheet
        .write_headings(&report.headings)
        .map_err(|e| ReportError::workbook(out, e))?;
    for row in &report.rows {
        sheet.write_cells(row).map_err(|e| ReportError::workbook(out, e))?;
    }
    emitter.push(sheet).map_err(|e| ReportError::workbook(out, e))?;
    emitter.save(out)
}

/// Reduce any GMAT report with a heading row to `<stem>.xlsx`.
///
/// Returns the written path, or `None` when the output existed and was kept.
pub fn reduce_report(path: &Path, policy: ExistingOutput) -> Result<Option<PathBuf>, ReportError> {
    let Some(out) = resolve_output_path(&workbook_path_for(path), policy) else {
        return Ok(None);
    };
    let table = {
        let normalized = normalize_file(path)?;
        read_table(normalized.path())?
    };
    let report = classify_table(&table, ReportClassifier::new())?;
    if report.headings.is_empty() {
        return Err(ReportError::validation(path, "report has no heading row"));
    }
    write_report_workbook(&report, &out)?;
    info!(input = %path.display(), output = %out.display(), rows = report.rows.len(), "✓ Report reduced");
    Ok(Some(out))
}

/// Reduce every report in `paths`, logging and counting failures.
pub fn reduce_batch(paths: &[PathBuf], policy: ExistingOutput) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for path in paths {
        match reduce_report(path, policy) {
            Ok(Some(_)) => summary.record_success(),
            Ok(None) => summary.record_skip(),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Report reduction failed");
                summary.record_failure(path, e.to_string());
            }
        }
    }
    summary
}

/// Result of formatting one link report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLink {
    pub key: CorrelationKey,
    /// Workbook the contact report builder will read.
    pub workbook: PathBuf,
    /// `false` when an existing workbook was kept or the input already was one.
    pub written: bool,
}

/// Format a link report to `<stem>.xlsx` and identify its correlation key.
///
/// A workbook input is only validated. When the output exists and the policy
/// says skip, the existing workbook is used.
pub fn format_link_report(path: &Path, config: &ReportsConfig) -> Result<FormattedLink, ReportError> {
    let link = load_link_report(path, config.offset_columns)?;
    if is_workbook(path) {
        return Ok(FormattedLink {
            key: link.key,
            workbook: path.to_path_buf(),
            written: false,
        });
    }

    let candidate = workbook_path_for(path);
    let Some(out) = resolve_output_path(&candidate, config.existing_output) else {
        return Ok(FormattedLink {
            key: link.key,
            workbook: candidate,
            written: false,
        });
    };
    write_report_workbook(&link.report, &out)?;
    info!(
        input = %path.display(),
        output = %out.display(),
        key = %link.key,
        rows = link.table.len(),
        "✓ Link report formatted"
    );
    Ok(FormattedLink {
        key: link.key,
        workbook: out,
        written: true,
    })
}

/// Format every link report in `paths` and collect the correlation lookup.
pub fn build_link_lookup(paths: &[PathBuf], config: &ReportsConfig) -> (LinkLookup, BatchSummary) {
    let mut lookup = LinkLookup::new();
    let mut summary = BatchSummary::default();
    for path in paths {
        match format_link_report(path, config) {
            Ok(formatted) => {
                if formatted.written {
                    summary.record_success();
                } else {
                    summary.record_skip();
                }
                lookup.register(formatted.key, formatted.workbook);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Link report failed");
                summary.record_failure(path, e.to_string());
            }
        }
    }
    info!(
        keys = lookup.len(),
        formatted = summary.succeeded,
        failed = summary.failed(),
        "Link lookup built"
    );
    (lookup, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "Sat1.A1Gregorian           Sat1.Earth.Altitude    AOI_North.X   AOI_North.Y   AOI_North.Z\n\
                        01 Jan 2024 00:00:00.000   7000.1234              3.0000        4.0000        0.0000\n\
                        01 Jan 2024 00:01:00.000   7000.5678              3.5000        4.5000        0.5000\n";

    #[test]
    fn test_format_link_report_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Link_Sat1.txt");
        std::fs::write(&path, LINK).unwrap();

        let formatted = format_link_report(&path, &ReportsConfig::default()).unwrap();
        assert_eq!(formatted.key, CorrelationKey::new("Sat1", "North").unwrap());
        assert_eq!(formatted.workbook, dir.path().join("Link_Sat1.xlsx"));
        assert!(formatted.written);

        let reloaded = crate::report::link_table::load_link_table(&formatted.workbook, [4, 5, 6]).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.offset_columns(), [2, 3, 4]);
    }

    #[test]
    fn test_skip_policy_keeps_existing_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Link_Sat1.txt");
        std::fs::write(&path, LINK).unwrap();
        let config = ReportsConfig {
            existing_output: ExistingOutput::Skip,
            ..ReportsConfig::default()
        };
        assert!(format_link_report(&path, &config).unwrap().written);
        let again = format_link_report(&path, &config).unwrap();
        assert!(!again.written);
        assert_eq!(again.workbook, dir.path().join("Link_Sat1.xlsx"));
    }

    #[test]
    fn test_build_link_lookup_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("Link_Sat1.txt");
        std::fs::write(&good, LINK).unwrap();
        let bad = dir.path().join("Link_Bad.txt");
        std::fs::write(&bad, "Time X Y Z\n1 2 3 4\n").unwrap();

        let (lookup, summary) = build_link_lookup(&[good, bad], &ReportsConfig::default());
        assert_eq!(lookup.len(), 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.exit_code(), 2);
    }

    #[test]
    fn test_reduce_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Orbit.txt");
        std::fs::write(&path, "Sat1.ElapsedDays   Sat1.SMA\n0.0   7000.0000\n1.0   7001.5\n").unwrap();
        let out = reduce_report(&path, ExistingOutput::Overwrite).unwrap().unwrap();
        assert!(out.exists());
        assert_eq!(reduce_report(&path, ExistingOutput::Skip).unwrap(), None);
    }
}
