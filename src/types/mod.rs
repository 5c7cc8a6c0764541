//! Shared data structures for the report correlation pipeline
//!
//! This module defines the records that flow between pipeline stages:
//! - `DelimitedTable`: parsed rows of a normalized report
//! - `Cell`: a typed field of a link report row
//! - `CorrelationKey`, `VisibilityWindow`, `TimeWindowMap`: contact windows
//! - `LinkRow`, `LinkTable`: time-ordered link report data

mod table;
mod window;
mod link;

pub use table::*;
pub use window::*;
pub use link::*;

/// Construction-time validation failures of the pipeline records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("window stop {stop} precedes start {start}")]
    InvertedWindow {
        start: chrono::NaiveDateTime,
        stop: chrono::NaiveDateTime,
    },

    #[error("empty {0} identifier")]
    EmptyIdentifier(&'static str),

    #[error("link rows out of time order at row {row}: {current} follows {previous}")]
    OutOfOrder {
        row: usize,
        previous: chrono::NaiveDateTime,
        current: chrono::NaiveDateTime,
    },

    #[error("offset column {column} is outside the {width}-column heading row")]
    OffsetColumn { column: usize, width: usize },
}
