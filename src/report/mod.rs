//! GMAT report pipeline
//!
//! Single-threaded, file at a time:
//!
//! ```text
//! raw report ─► normalizer ─► reader ─► classifier ─┬─► windows  ─┐
//!                                                   └─► link table ┴─► selector ─► emitter ─► .xlsx
//! ```
//!
//! - [`normalizer`] collapses GMAT's space-aligned columns into comma-separated text
//!   in a staging file removed on drop.
//! - [`reader`] turns that text into a [`DelimitedTable`](crate::types::DelimitedTable).
//! - [`classifier`] holds the row classifiers: the contact locator state machine,
//!   the link report heading rules and the generic report typer.
//! - [`selector`] binary-searches a link table for the rows inside a contact window.
//! - [`emitter`] writes typed rows and correlated blocks with `rust_xlsxwriter`.
//!
//! Errors are per file ([`ReportError`]); batch loops log them, tally them in a
//! [`BatchSummary`] and carry on.

mod error;
mod normalizer;
mod reader;

pub mod batch;
pub mod classifier;
pub mod contact_report;
pub mod emitter;
pub mod link_report;
pub mod link_table;
pub mod output;
pub mod selector;
pub mod timestamp;
pub mod windows;

pub use batch::{read_batch_list, BatchFailure, BatchSummary};
pub use contact_report::{
    build_contact_report, build_contact_report_with, build_contact_reports, build_contact_reports_with,
    ContactSummary,
};
pub use error::ReportError;
pub use link_report::{build_link_lookup, format_link_report, reduce_batch, reduce_report, FormattedLink};
pub use link_table::{load_link_table, LinkLookup};
pub use normalizer::{normalize_file, normalize_text, NormalizedFile};
pub use reader::{parse_table, read_table};
pub use selector::{select, Derived, DerivedColumn, DerivedColumns, Selection};
pub use windows::extract_windows;
