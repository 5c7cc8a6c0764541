//! GMAT model generator
//!
//! Expands a parameter table into one runnable GMAT script per case. Every
//! case gets an `.include` file holding its resource assignments and a copy of
//! the mission template that pulls in, in order, the static definitions, the
//! case include and the mission sequence. The generated scripts and their
//! expected report files are listed in `RunList_<tag>.batch` and
//! `ReportList_<tag>.batch` for the batch runner and the report tools.

use std::path::{Path, PathBuf};

pub mod parameters;
pub mod writer;

pub use parameters::{read_parameter_table, ModelCase, ParameterTable};
pub use writer::{name_root, time_tag, GeneratedCase, Generation, ModelWriter};

#[derive(Debug, thiserror::Error)]
pub enum ModelGenError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read parameter workbook {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: {reason}")]
    Validation { path: PathBuf, reason: String },

    #[error("refusing to overwrite existing script {0}")]
    ScriptExists(PathBuf),
}

impl ModelGenError {
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
}
