//! Delimited record table produced by the tabular reader

use std::collections::BTreeMap;

/// Rows of a normalized delimited file keyed by zero-based line number.
///
/// Blank lines leave gaps in the numbering; field order within a row is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelimitedTable {
    rows: BTreeMap<usize, Vec<String>>,
}

impl DelimitedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the fields of one row.
    pub fn insert(&mut self, row: usize, fields: Vec<String>) {
        self.rows.insert(row, fields);
    }

    pub fn get(&self, row: usize) -> Option<&[String]> {
        self.rows.get(&row).map(Vec::as_slice)
    }

    /// Rows in ascending row order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows.iter().map(|(r, f)| (*r, f.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(usize, Vec<String>)> for DelimitedTable {
    fn from_iter<I: IntoIterator<Item = (usize, Vec<String>)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
