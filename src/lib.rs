//! GMAT Automation: batch runs and report post-processing for GMAT missions
//!
//! ## Architecture
//!
//! - **Model Generator**: expands a parameter table into per-case GMAT scripts
//! - **Batch Runner**: runs GMAT over a script list on a bounded process pool
//! - **Report Pipeline**: normalizes GMAT reports, classifies them, correlates
//!   contact windows with link geometry and writes Excel workbooks

pub mod batcher;
pub mod config;
pub mod modelgen;
pub mod report;
pub mod types;

// Re-export configuration
pub use config::AutomationConfig;

// Re-export commonly used types
pub use types::{
    Cell, CorrelationKey, DelimitedTable, LinkRow, LinkTable, RecordError, TimeWindowMap,
    VisibilityWindow,
};

// Re-export the report pipeline entry points
pub use report::{
    build_contact_report, build_link_lookup, extract_windows, normalize_text, read_batch_list,
    read_table, select, BatchSummary, ContactSummary, LinkLookup, ReportError,
};

// Re-export the runner and generator
pub use batcher::{BatchRunner, BatcherError, RunOutcome, RunReport};
pub use modelgen::{ModelGenError, ModelWriter, ParameterTable};
