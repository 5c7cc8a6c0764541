//! Output path policy for generated workbooks

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ExistingOutput;

/// `<input stem>.xlsx` next to the input.
pub fn workbook_path_for(input: &Path) -> PathBuf {
    input.with_extension("xlsx")
}

/// Where to write `candidate` under `policy`, or `None` if it should be skipped.
///
/// `Version` picks the first free `<stem>_<n>.xlsx`.
pub fn resolve_output_path(candidate: &Path, policy: ExistingOutput) -> Option<PathBuf> {
    if !candidate.exists() {
        return Some(candidate.to_path_buf());
    }
    match policy {
        ExistingOutput::Overwrite => {
            debug!(path = %candidate.display(), "Overwriting existing output");
            Some(candidate.to_path_buf())
        }
        ExistingOutput::Skip => {
            info!(path = %candidate.display(), "Output exists, skipping");
            None
        }
        ExistingOutput::Version => {
            let stem = candidate
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let ext = candidate
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "xlsx".to_string());
            (1_u32..)
                .map(|n| candidate.with_file_name(format!("{stem}_{n}.{ext}")))
                .find(|p| !p.exists())
        }
    }
}
