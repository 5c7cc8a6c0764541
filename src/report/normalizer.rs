//! Text normalizer: turns GMAT's space-aligned report text into comma-delimited rows
//!
//! Three rewrites, applied per line in this order:
//! 1. runs of two or more spaces become one comma
//! 2. runs of commas become one comma
//! 3. trailing blank lines are dropped
//!
//! Single spaces survive, so `01 Jan 2024 00:00:00.000` stays one field.
//! The rewrite is idempotent.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tempfile::NamedTempFile;
use tracing::{debug, error};

use super::ReportError;

#[allow(clippy::expect_used)]
fn space_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("static pattern"))
}

#[allow(clippy::expect_used)]
fn comma_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",{2,}").expect("static pattern"))
}

/// A line with nothing but whitespace and delimiters.
fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c.is_whitespace() || c == ',')
}

/// Normalize report text. Line endings become `\n`.
pub fn normalize_text(raw: &str) -> String {
    let mut lines: Vec<String> = raw
        .lines()
        .map(|line| {
            let commas = space_runs().replace_all(line, ",");
            comma_runs().replace_all(&commas, ",").into_owned()
        })
        .collect();

    while lines.last().is_some_and(|l| is_blank(l)) {
        lines.pop();
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Normalized copy of a report, staged next to the source.
///
/// The staging file is removed when this value is dropped, on success and
/// error paths alike.
#[derive(Debug)]
pub struct NormalizedFile {
    source: PathBuf,
    staged: NamedTempFile,
}

impl NormalizedFile {
    /// Path of the normalized text.
    pub fn path(&self) -> &Path {
        self.staged.path()
    }

    /// The raw report this was produced from.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Normalize the report at `input` into a staging file. `input` is not modified.
pub fn normalize_file(input: &Path) -> Result<NormalizedFile, ReportError> {
    let raw = std::fs::read(input).map_err(|e| {
        error!(path = %input.display(), error = %e, "Cannot open report for normalization");
        ReportError::io(input, e)
    })?;
    let text = normalize_text(&String::from_utf8_lossy(&raw));

    let prefix = format!(
        "{}+",
        input.file_stem().and_then(|s| s.to_str()).unwrap_or("report")
    );
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".reduced.csv");
    let dir = input.parent().filter(|p| !p.as_os_str().is_empty());
    let staged = match dir {
        Some(dir) => builder.tempfile_in(dir).or_else(|_| builder.tempfile()),
        None => builder.tempfile(),
    }
    .map_err(|e| ReportError::io(input, e))?;

    let mut staged = staged;
    let staged_path = staged.path().to_path_buf();
    staged
        .write_all(text.as_bytes())
        .map_err(|e| ReportError::io(&staged_path, e))?;
    staged.flush().map_err(|e| ReportError::io(&staged_path, e))?;

    debug!(source = %input.display(), staged = %staged.path().display(), "Report normalized");
    Ok(NormalizedFile {
        source: input.to_path_buf(),
        staged,
    })
}
