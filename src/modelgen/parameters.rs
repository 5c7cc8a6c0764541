//! Parameter tables: GMAT resource names across, one case per row.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, DataType, Reader};
use tracing::{debug, info};

use super::ModelGenError;
use crate::report::link_table::is_workbook;
use crate::report::timestamp::format_gmat_time;

/// One row of the parameter table: resource name to GMAT value text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCase {
    pub assignments: Vec<(String, String)>,
}

impl ModelCase {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.assignments.iter().map(|(_, v)| v.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterTable {
    pub source: PathBuf,
    pub names: Vec<String>,
    pub cases: Vec<ModelCase>,
}

/// Render a number the way a GMAT script expects it: integral values without `.0`.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub fn render_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn render_data(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) => render_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|t| format!("'{}'", format_gmat_time(&t)))
            .unwrap_or_default(),
        Data::String(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => e.to_string(),
    }
}

fn render_text(field: &str) -> String {
    let field = field.trim();
    field
        .parse::<f64>()
        .ok()
        .filter(|_| field.contains('.'))
        .map_or_else(|| field.to_string(), render_number)
}

fn build_table(source: &Path, rows: Vec<Vec<String>>) -> Result<ParameterTable, ModelGenError> {
    let mut rows = rows.into_iter();
    let names: Vec<String> = rows
        .next()
        .ok_or_else(|| ModelGenError::validation(source, "parameter table is empty"))?
        .into_iter()
        .map(|n| n.trim().to_string())
        .collect();
    if names.iter().all(String::is_empty) {
        return Err(ModelGenError::validation(source, "first row names no GMAT resources"));
    }

    let cases: Vec<ModelCase> = rows
        .filter(|row| row.iter().any(|v| !v.is_empty()))
        .map(|row| ModelCase {
            assignments: names
                .iter()
                .zip(row)
                .filter(|(name, value)| !name.is_empty() && !value.is_empty())
                .map(|(name, value)| (name.clone(), value))
                .collect(),
        })
        .collect();

    info!(path = %source.display(), resources = names.len(), cases = cases.len(), "Parameter table read");
    Ok(ParameterTable {
        source: source.to_path_buf(),
        names,
        cases,
    })
}

/// Read a parameter table from a workbook (first or named sheet) or a CSV file.
pub fn read_parameter_table(path: &Path, sheet: Option<&str>) -> Result<ParameterTable, ModelGenError> {
    let rows: Vec<Vec<String>> = if is_workbook(path) {
        let spreadsheet_error = |source| ModelGenError::Spreadsheet {
            path: path.to_path_buf(),
            source,
        };
        let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;
        let sheet_name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| ModelGenError::validation(path, "workbook has no sheets"))?,
        };
        debug!(path = %path.display(), sheet = %sheet_name, "Reading parameter sheet");
        let range = workbook.worksheet_range(&sheet_name).map_err(spreadsheet_error)?;
        range
            .rows()
            .map(|r| r.iter().map(render_data).collect())
            .collect()
    } else {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| ModelGenError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| ModelGenError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            rows.push(record.iter().map(render_text).collect());
        }
        rows
    };
    build_table(path, rows)
}
