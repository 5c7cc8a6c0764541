//! Error type of the report pipeline

use std::path::{Path, PathBuf};

use crate::types::RecordError;

/// Failure while reducing, classifying or emitting one report file.
///
/// Every variant carries the file it concerns so batch loops can log and move on.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data-integrity problem: asset mismatch, missing heading, malformed structure.
    #[error("{path}: {reason}")]
    Validation { path: PathBuf, reason: String },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot read spreadsheet {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("cannot write workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

impl ReportError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn validation(path: &Path, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn record(path: &Path, source: &RecordError) -> Self {
        Self::validation(path, source.to_string())
    }

    pub fn workbook(path: &Path, source: rust_xlsxwriter::XlsxError) -> Self {
        Self::Workbook {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The file this error concerns.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Validation { path, .. }
            | Self::Csv { path, .. }
            | Self::Spreadsheet { path, .. }
            | Self::Workbook { path, .. } => path,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
