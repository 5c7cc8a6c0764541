//! GMAT batch runner
//!
//! Runs a list of GMAT scripts on a bounded pool of child processes:
//!
//! - [`locator`] finds the GMAT executable and its default output directory.
//! - [`runner`] spawns one tokio task per script behind a semaphore sized to the
//!   machine, enforces the per-script timeout, and streams a [`RunReport`] per
//!   script back through a single channel until every task has finished.

use std::path::PathBuf;

use crate::report::ReportError;

pub mod locator;
pub mod runner;

pub use locator::{locate_executable, output_dir};
pub use runner::{filter_output, load_scripts, pool_size_for, BatchRunner, RunOutcome, RunReport};

/// Failure to set up a batch run. Failures of individual scripts are
/// [`RunOutcome`]s, not errors.
#[derive(Debug, thiserror::Error)]
pub enum BatcherError {
    #[error("GMAT executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("batch list {0} has no runnable scripts")]
    EmptyBatch(PathBuf),

    #[error(transparent)]
    BatchList(#[from] ReportError),
}
