//! Batch list files and per-batch outcome tallies

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::ReportError;

/// Read a batch list: one path per line, blank lines ignored.
///
/// Lines whose extension is not in `suffixes` (case-insensitive) are skipped,
/// as are paths that don't exist; both are logged. Relative paths resolve
/// against the list's own directory.
pub fn read_batch_list<S: AsRef<str>>(path: &Path, suffixes: &[S]) -> Result<Vec<PathBuf>, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut entries = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry = Path::new(line);
        let suffix_ok = entry
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| suffixes.iter().any(|s| s.as_ref().eq_ignore_ascii_case(e)));
        if !suffix_ok {
            debug!(list = %path.display(), line = line_no + 1, entry = line, "Skipping entry with unexpected suffix");
            continue;
        }
        let resolved = if entry.is_absolute() { entry.to_path_buf() } else { base.join(entry) };
        if !resolved.exists() {
            warn!(list = %path.display(), line = line_no + 1, entry = %resolved.display(), "Batch entry does not exist, skipping");
            continue;
        }
        entries.push(resolved);
    }
    Ok(entries)
}

/// One failed item of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Tally of a batch run, reported at the end and turned into the exit code.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, path: &Path, reason: impl Into<String>) {
        self.failures.push(BatchFailure {
            path: path.to_path_buf(),
            reason: reason.into(),
        });
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed()
    }

    pub fn merge(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    /// 0 when every item succeeded, 2 when some were skipped or failed, 1 when
    /// nothing succeeded.
    ///
    /// An empty batch counts as total failure.
    pub fn exit_code(&self) -> u8 {
        if self.succeeded == 0 {
            1
        } else if self.succeeded == self.total() {
            0
        } else {
            2
        }
    }
}
