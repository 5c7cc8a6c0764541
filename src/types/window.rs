//! Contact windows and the (asset, area) key joining them to link reports

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::RecordError;

// ============================================================================
// Correlation Key
// ============================================================================

/// The (asset, area-of-interest) pair joining a contact window to its link report.
///
/// Displayed as `asset@area`, the form used in log lines and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub asset_id: String,
    pub area_id: String,
}

impl CorrelationKey {
    pub fn new(asset_id: impl Into<String>, area_id: impl Into<String>) -> Result<Self, RecordError> {
        let asset_id = asset_id.into();
        let area_id = area_id.into();
        if asset_id.trim().is_empty() {
            return Err(RecordError::EmptyIdentifier("asset"));
        }
        if area_id.trim().is_empty() {
            return Err(RecordError::EmptyIdentifier("area"));
        }
        Ok(Self { asset_id, area_id })
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.asset_id, self.area_id)
    }
}

// ============================================================================
// Visibility Window
// ============================================================================

/// One contact interval of an asset seen from an area of interest.
///
/// Invariant: `start <= stop`, enforced by [`VisibilityWindow::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityWindow {
    pub key: CorrelationKey,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    /// Duration text as reported by GMAT (seconds), kept verbatim.
    pub duration: String,
}

impl VisibilityWindow {
    pub fn new(
        key: CorrelationKey,
        start: NaiveDateTime,
        stop: NaiveDateTime,
        duration: impl Into<String>,
    ) -> Result<Self, RecordError> {
        if stop < start {
            return Err(RecordError::InvertedWindow { start, stop });
        }
        Ok(Self {
            key,
            start,
            stop,
            duration: duration.into(),
        })
    }

    /// Reported duration in seconds, falling back to `stop - start`.
    pub fn duration_secs(&self) -> f64 {
        self.duration
            .trim()
            .parse::<f64>()
            .unwrap_or_else(|_| self.elapsed_secs())
    }

    /// `stop - start` in seconds, millisecond resolution.
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_secs(&self) -> f64 {
        (self.stop - self.start).num_milliseconds() as f64 / 1000.0
    }
}

// ============================================================================
// Time Window Map
// ============================================================================

/// Windows grouped by correlation key, keys kept in first-seen order.
///
/// Committing a section for a key that is already present appends to it.
#[derive(Debug, Clone, Default)]
pub struct TimeWindowMap {
    entries: Vec<(CorrelationKey, Vec<VisibilityWindow>)>,
    index: HashMap<CorrelationKey, usize>,
}

impl TimeWindowMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed section's windows under `key`.
    pub fn commit(&mut self, key: CorrelationKey, windows: Vec<VisibilityWindow>) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1.extend(windows),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, windows));
            }
        }
    }

    pub fn get(&self, key: &CorrelationKey) -> Option<&[VisibilityWindow]> {
        self.index.get(key).map(|&i| self.entries[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CorrelationKey, &[VisibilityWindow])> {
        self.entries.iter().map(|(k, w)| (k, w.as_slice()))
    }

    /// Distinct area ids in first-seen order; one output sheet each.
    pub fn areas(&self) -> Vec<&str> {
        let mut areas: Vec<&str> = Vec::new();
        for (key, _) in &self.entries {
            if !areas.contains(&key.area_id.as_str()) {
                areas.push(&key.area_id);
            }
        }
        areas
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window_count(&self) -> usize {
        self.entries.iter().map(|(_, w)| w.len()).sum()
    }
}
