//! Link report rows: typed cells ordered by their A1 Gregorian epoch

use chrono::NaiveDateTime;

use super::RecordError;

/// A typed field of a link report.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Timestamp(NaiveDateTime),
    /// A decimal with the number of places it is displayed with (2 or 4).
    Number { value: f64, places: u8 },
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// One data row of a link report.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRow {
    /// Value of column 0.
    pub timestamp: NaiveDateTime,
    /// All columns, column 0 included.
    pub cells: Vec<Cell>,
}

impl LinkRow {
    /// The X/Y/Z relative position at the given columns, if all three are numeric.
    pub fn offset(&self, columns: [usize; 3]) -> Option<[f64; 3]> {
        let [x, y, z] = columns.map(|c| self.cells.get(c).and_then(Cell::as_f64));
        Some([x?, y?, z?])
    }
}

/// A link report: heading row plus data rows in non-decreasing time order.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTable {
    headings: Vec<String>,
    rows: Vec<LinkRow>,
    offset_columns: [usize; 3],
}

impl LinkTable {
    /// Build a table, rejecting rows out of time order and offset
    /// columns beyond the heading row.
    pub fn new(
        headings: Vec<String>,
        rows: Vec<LinkRow>,
        offset_columns: [usize; 3],
    ) -> Result<Self, RecordError> {
        for &column in &offset_columns {
            if column >= headings.len() {
                return Err(RecordError::OffsetColumn {
                    column,
                    width: headings.len(),
                });
            }
        }
        for (i, pair) in rows.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(RecordError::OutOfOrder {
                    row: i + 2,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        Ok(Self {
            headings,
            rows,
            offset_columns,
        })
    }

    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    pub fn rows(&self) -> &[LinkRow] {
        &self.rows
    }

    pub fn offset_columns(&self) -> [usize; 3] {
        self.offset_columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
