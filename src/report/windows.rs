//! Time-window extractor: contact locator report file to `VisibilityReport`

use std::path::Path;

use tracing::info;

use super::classifier::{classify_table, VisibilityClassifier, VisibilityReport};
use super::{normalize_file, read_table, ReportError};
use crate::config::UnterminatedSection;

/// Normalize, read and classify one contact locator report.
///
/// The staging file is gone by the time this returns.
pub fn extract_windows(
    path: &Path,
    unterminated: UnterminatedSection,
) -> Result<VisibilityReport, ReportError> {
    let table = {
        let normalized = normalize_file(path)?;
        read_table(normalized.path())?
    };
    let report = classify_table(&table, VisibilityClassifier::new(path, unterminated))?;
    info!(
        path = %path.display(),
        keys = report.windows.len(),
        windows = report.windows.window_count(),
        "Contact windows extracted"
    );
    Ok(report)
}
