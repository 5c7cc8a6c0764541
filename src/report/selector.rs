//! Correlated data selector
//!
//! For a contact window, finds the link rows whose epochs fall inside
//! `[start, stop]` by binary search over the time-ordered link table. The
//! [`DerivedColumn`]s computed from each row's X/Y/Z offsets (slant range,
//! azimuth and elevation unless the caller adds more) are defined here too.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::NaiveDateTime;
use tracing::warn;

use super::link_table::{load_link_table, LinkLookup};
use crate::types::{CorrelationKey, LinkRow, LinkTable, VisibilityWindow};

/// A column computed from a link row's X/Y/Z offsets, appended after the
/// link report's own columns.
///
/// The sheet gets `formula` so the value recomputes when the offsets are
/// edited; `value` is cached alongside it for readers without a calculation
/// engine. Both must describe the same quantity.
pub trait DerivedColumn: fmt::Debug {
    fn heading(&self) -> &str;

    /// Formula text over the cell references of the three offsets. Sheet
    /// `ATAN2` takes `(x_num, y_num)`.
    fn formula(&self, x: &str, y: &str, z: &str) -> String;

    fn value(&self, offset: [f64; 3]) -> f64;
}

/// `|(x, y, z)|`
#[derive(Debug, Clone, Copy, Default)]
pub struct SlantRange;

impl DerivedColumn for SlantRange {
    fn heading(&self) -> &str {
        "Slant.Range.(km)"
    }

    fn formula(&self, x: &str, y: &str, z: &str) -> String {
        format!("=SQRT({x}^2+{y}^2+{z}^2)")
    }

    fn value(&self, [x, y, z]: [f64; 3]) -> f64 {
        x.hypot(y).hypot(z)
    }
}

/// Angle of `(x, y)` from the x axis, quadrant-correct.
#[derive(Debug, Clone, Copy, Default)]
pub struct Azimuth;

impl DerivedColumn for Azimuth {
    fn heading(&self) -> &str {
        "Azimuth.(deg)"
    }

    fn formula(&self, x: &str, y: &str, _z: &str) -> String {
        format!("=DEGREES(ATAN2({x},{y}))")
    }

    fn value(&self, [x, y, _]: [f64; 3]) -> f64 {
        y.atan2(x).to_degrees()
    }
}

/// Angle above the x/y plane: 90 overhead, 0 on the horizon.
#[derive(Debug, Clone, Copy, Default)]
pub struct Elevation;

impl DerivedColumn for Elevation {
    fn heading(&self) -> &str {
        "Elevation.(deg)"
    }

    fn formula(&self, x: &str, y: &str, z: &str) -> String {
        format!("=DEGREES(ATAN2(SQRT({x}^2+{y}^2),{z}))")
    }

    fn value(&self, [x, y, z]: [f64; 3]) -> f64 {
        z.atan2(x.hypot(y)).to_degrees()
    }
}

/// The derived columns of a correlated sheet, in the order they are appended.
#[derive(Debug)]
pub struct DerivedColumns {
    columns: Vec<Box<dyn DerivedColumn>>,
}

impl Default for DerivedColumns {
    /// Slant range, azimuth and elevation.
    fn default() -> Self {
        Self::empty().with(SlantRange).with(Azimuth).with(Elevation)
    }
}

impl DerivedColumns {
    pub fn empty() -> Self {
        Self { columns: Vec::new() }
    }

    /// Append `column` after the existing ones.
    pub fn with(mut self, column: impl DerivedColumn + 'static) -> Self {
        self.columns.push(Box::new(column));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn DerivedColumn> {
        self.columns.iter().map(|column| &**column as &dyn DerivedColumn)
    }

    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|column| column.heading())
    }
}

/// Geometry derived from one relative position vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub slant_range: f64,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl Derived {
    pub fn from_offset(offset: [f64; 3]) -> Self {
        Self {
            slant_range: SlantRange.value(offset),
            azimuth_deg: Azimuth.value(offset),
            elevation_deg: Elevation.value(offset),
        }
    }
}

/// Rows `[row_start, row_stop)` of `table` with `start <= t <= stop`.
///
/// `row_start` is the leftmost row with `t >= start`, `row_stop` the leftmost
/// with `t > stop`. An instant window selects the rows at that epoch, possibly none.
pub fn select_range(table: &LinkTable, start: NaiveDateTime, stop: NaiveDateTime) -> Range<usize> {
    let rows = table.rows();
    let row_start = rows.partition_point(|r| r.timestamp < start);
    let row_stop = rows.partition_point(|r| r.timestamp <= stop).max(row_start);
    row_start..row_stop
}

/// A selected link row with its X/Y/Z offsets.
#[derive(Debug, Clone, Copy)]
pub struct SelectedRow<'t> {
    pub row: &'t LinkRow,
    /// `None` when an offset cell isn't numeric.
    pub offset: Option<[f64; 3]>,
}

impl SelectedRow<'_> {
    pub fn derived(&self) -> Option<Derived> {
        self.offset.map(Derived::from_offset)
    }
}

/// The link rows correlated with one contact window.
#[derive(Debug, Clone)]
pub struct Selection<'t> {
    pub range: Range<usize>,
    pub rows: Vec<SelectedRow<'t>>,
}

/// Select the rows of `table` inside `window` with their offsets.
pub fn select<'t>(window: &VisibilityWindow, table: &'t LinkTable) -> Selection<'t> {
    let range = select_range(table, window.start, window.stop);
    let offsets = table.offset_columns();
    let rows = table.rows()[range.clone()]
        .iter()
        .map(|row| SelectedRow {
            row,
            offset: row.offset(offsets),
        })
        .collect();
    Selection { range, rows }
}

/// Link tables opened while processing one contact report.
///
/// Each link file is loaded at most once; missing keys and unreadable files are
/// logged and remembered so the same warning isn't repeated per window.
#[derive(Debug)]
pub struct LinkCache<'l> {
    lookup: &'l LinkLookup,
    fallback_offsets: [usize; 3],
    tables: HashMap<PathBuf, Option<Rc<LinkTable>>>,
}

impl<'l> LinkCache<'l> {
    pub fn new(lookup: &'l LinkLookup, fallback_offsets: [usize; 3]) -> Self {
        Self {
            lookup,
            fallback_offsets,
            tables: HashMap::new(),
        }
    }

    /// The link table for `key`, or `None` (already logged) when it can't be had.
    pub fn table_for(&mut self, key: &CorrelationKey) -> Option<Rc<LinkTable>> {
        let lookup = self.lookup;
        let Some(path) = lookup.get(key) else {
            warn!(key = %key, "No link report registered for key, skipping its windows");
            return None;
        };
        let fallback = self.fallback_offsets;
        self.tables
            .entry(path.to_path_buf())
            .or_insert_with(|| match load_link_table(path, fallback) {
                Ok(table) => Some(Rc::new(table)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Link report unusable, skipping its windows");
                    None
                }
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, CorrelationKey};
    use chrono::{NaiveDate, TimeDelta};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    /// One row per minute from 23:55 on 31 Dec to 00:15 on 1 Jan.
    fn minute_table() -> LinkTable {
        let first = at(0, 0) - TimeDelta::minutes(5);
        let rows = (0..=20)
            .map(|i| {
                let t = first + TimeDelta::minutes(i);
                LinkRow {
                    timestamp: t,
                    cells: vec![
                        Cell::Timestamp(t),
                        Cell::Number { value: 3.0, places: 4 },
                        Cell::Number { value: 4.0, places: 4 },
                        Cell::Number { value: 0.0, places: 4 },
                    ],
                }
            })
            .collect();
        let headings = ["Sat1.A1Gregorian", "AOI_North.X", "AOI_North.Y", "AOI_North.Z"]
            .iter()
            .map(ToString::to_string)
            .collect();
        LinkTable::new(headings, rows, [1, 2, 3]).unwrap()
    }

    fn window(start: NaiveDateTime, stop: NaiveDateTime) -> VisibilityWindow {
        VisibilityWindow::new(CorrelationKey::new("Sat1", "North").unwrap(), start, stop, "600").unwrap()
    }

    #[test]
    fn test_selects_inclusive_window() {
        let table = minute_table();
        let selection = select(&window(at(0, 0), at(0, 10)), &table);
        assert_eq!(selection.rows.len(), 11);
        assert_eq!(selection.rows[0].row.timestamp, at(0, 0));
        assert_eq!(selection.rows[10].row.timestamp, at(0, 10));
    }

    #[test]
    fn test_range_matches_linear_scan() {
        let table = minute_table();
        let start = at(0, 0) - TimeDelta::seconds(90);
        for len in [0_i64, 30, 60, 61, 600, 1_800] {
            let stop = start + TimeDelta::seconds(len);
            let range = select_range(&table, start, stop);
            let expected: Vec<usize> = (0..table.len())
                .filter(|&i| {
                    let t = table.rows()[i].timestamp;
                    t >= start && t <= stop
                })
                .collect();
            assert_eq!(range.clone().collect::<Vec<_>>(), expected, "len {len}");
        }
    }

    #[test]
    fn test_instant_window_between_rows_selects_nothing() {
        let table = minute_table();
        let t = at(0, 3) + TimeDelta::seconds(30);
        assert!(select(&window(t, t), &table).rows.is_empty());
    }

    #[test]
    fn test_instant_window_on_row_selects_it() {
        let table = minute_table();
        assert_eq!(select(&window(at(0, 3), at(0, 3)), &table).rows.len(), 1);
    }

    #[test]
    fn test_window_outside_table() {
        let table = minute_table();
        assert!(select(&window(at(5, 0), at(6, 0)), &table).rows.is_empty());
    }

    #[test]
    fn test_slant_range_three_four_zero() {
        let d = Derived::from_offset([3.0, 4.0, 0.0]);
        assert_eq!(format!("{:.4}", d.slant_range), "5.0000");
    }

    #[test]
    fn test_azimuth_measured_from_x_axis() {
        assert!(Derived::from_offset([10.0, 0.0, 0.0]).azimuth_deg.abs() < 1e-9);
        assert!((Derived::from_offset([0.0, 10.0, 0.0]).azimuth_deg - 90.0).abs() < 1e-9);
        // atan(y/x) would fold this into the first quadrant.
        let d = Derived::from_offset([-1.0, -1.0, 0.0]);
        assert!((d.azimuth_deg - -135.0).abs() < 1e-9);
    }

    #[test]
    fn test_elevation_measured_from_horizon() {
        let overhead = Derived::from_offset([0.0, 0.0, 10.0]);
        assert!((overhead.elevation_deg - 90.0).abs() < 1e-9);
        let horizon = Derived::from_offset([0.0, 10.0, 0.0]);
        assert!(horizon.elevation_deg.abs() < 1e-9);
        let below = Derived::from_offset([3.0, 4.0, -5.0]);
        assert!((below.elevation_deg - -45.0).abs() < 1e-9);
    }

    #[test]
    fn test_formulas_follow_sheet_atan2_order() {
        assert_eq!(SlantRange.formula("B2", "C2", "D2"), "=SQRT(B2^2+C2^2+D2^2)");
        assert_eq!(Azimuth.formula("B2", "C2", "D2"), "=DEGREES(ATAN2(B2,C2))");
        assert_eq!(
            Elevation.formula("B2", "C2", "D2"),
            "=DEGREES(ATAN2(SQRT(B2^2+C2^2),D2))"
        );
    }

    #[derive(Debug)]
    struct GroundRange;

    impl DerivedColumn for GroundRange {
        fn heading(&self) -> &str {
            "Ground.Range.(km)"
        }

        fn formula(&self, x: &str, y: &str, _z: &str) -> String {
            format!("=SQRT({x}^2+{y}^2)")
        }

        fn value(&self, [x, y, _]: [f64; 3]) -> f64 {
            x.hypot(y)
        }
    }

    #[test]
    fn test_extra_column_appends_after_geometry() {
        let columns = DerivedColumns::default().with(GroundRange);
        assert_eq!(
            columns.headings().collect::<Vec<_>>(),
            vec!["Slant.Range.(km)", "Azimuth.(deg)", "Elevation.(deg)", "Ground.Range.(km)"]
        );
        let values: Vec<f64> = columns.iter().map(|c| c.value([3.0, 4.0, 12.0])).collect();
        assert!((values[0] - 13.0).abs() < 1e-12);
        assert!((values[3] - 5.0).abs() < 1e-12);
        assert!(DerivedColumns::empty().is_empty());
    }

    #[test]
    fn test_non_numeric_offset_has_no_geometry() {
        let t = at(0, 0);
        let table = LinkTable::new(
            minute_table().headings().to_vec(),
            vec![LinkRow {
                timestamp: t,
                cells: vec![
                    Cell::Timestamp(t),
                    Cell::Text("n/a".into()),
                    Cell::Number { value: 4.0, places: 4 },
                    Cell::Number { value: 0.0, places: 4 },
                ],
            }],
            [1, 2, 3],
        )
        .unwrap();
        let selection = select(&window(t, t), &table);
        assert!(selection.rows[0].offset.is_none());
        assert!(selection.rows[0].derived().is_none());
    }

    #[test]
    fn test_cache_skips_missing_key() {
        let lookup = LinkLookup::new();
        let mut cache = LinkCache::new(&lookup, [4, 5, 6]);
        assert!(cache.table_for(&CorrelationKey::new("Sat1", "North").unwrap()).is_none());
    }

    #[test]
    fn test_cache_remembers_unreadable_file() {
        let mut lookup = LinkLookup::new();
        let key = CorrelationKey::new("Sat1", "North").unwrap();
        lookup.register(key.clone(), PathBuf::from("/nonexistent/Link_Sat1.xlsx"));
        let mut cache = LinkCache::new(&lookup, [4, 5, 6]);
        assert!(cache.table_for(&key).is_none());
        assert!(cache.table_for(&key).is_none());
        assert_eq!(cache.tables.len(), 1);
    }
}
