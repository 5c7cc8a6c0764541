//! GMAT UTC Gregorian timestamps and field typing
//!
//! GMAT writes epochs as `01 Jan 2024 00:00:00.000`. Fields of that shape become
//! timestamps, decimals become numbers shown with 2 or 4 places depending on how
//! many fractional digits GMAT printed, everything else stays text.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::config::defaults::PRECISE_DECIMAL_DIGITS;
use crate::types::Cell;

/// chrono format used to render GMAT epochs.
pub const GMAT_TIME_FORMAT: &str = "%d %b %Y %H:%M:%S%.3f";

/// Parse format; accepts any number of fractional digits.
const GMAT_TIME_PARSE: &str = "%d %b %Y %H:%M:%S%.f";

#[allow(clippy::expect_used)]
fn gmat_time_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{1,2} [A-Z][a-z]{2} \d{4} \d{2}:\d{2}:\d{2}\.\d{3}$").expect("static pattern")
    })
}

#[allow(clippy::expect_used)]
fn decimal_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+)(\.(\d*))?([eE][+-]?\d+)?$").expect("static pattern")
    })
}

/// Whether `field` has the GMAT epoch shape.
pub fn is_gmat_time(field: &str) -> bool {
    gmat_time_pattern().is_match(field)
}

/// Parse a GMAT epoch. `None` if the field doesn't have the epoch shape
/// or names an impossible date.
pub fn parse_gmat_time(field: &str) -> Option<NaiveDateTime> {
    if !is_gmat_time(field) {
        return None;
    }
    NaiveDateTime::parse_from_str(field, GMAT_TIME_PARSE).ok()
}

pub fn format_gmat_time(t: &NaiveDateTime) -> String {
    t.format(GMAT_TIME_FORMAT).to_string()
}

/// Display places for a decimal field: 4 when GMAT printed at least four
/// fractional digits, otherwise 2. `None` for non-numeric text.
pub fn decimal_places(field: &str) -> Option<u8> {
    let caps = decimal_pattern().captures(field)?;
    let fraction = caps.get(3).map_or(0, |m| m.as_str().len());
    Some(if fraction >= PRECISE_DECIMAL_DIGITS { 4 } else { 2 })
}

/// Type one raw field.
pub fn classify_cell(field: &str) -> Cell {
    let field = field.trim();
    if field.is_empty() {
        return Cell::Empty;
    }
    if let Some(t) = parse_gmat_time(field) {
        return Cell::Timestamp(t);
    }
    if let Some(places) = decimal_places(field) {
        if let Ok(value) = field.parse::<f64>() {
            return Cell::Number { value, places };
        }
    }
    Cell::Text(field.to_string())
}
