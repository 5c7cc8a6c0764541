//! Per-case include files, script copies and the run/report batch lists.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use super::{ModelCase, ModelGenError, ParameterTable};
use crate::config::defaults::MODELGEN_TIME_TAG;
use crate::config::ModelGenConfig;

/// UTC time tag appended to every generated name, e.g. `J009_053725`.
pub fn time_tag(now: DateTime<Utc>) -> String {
    now.format(MODELGEN_TIME_TAG).to_string()
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// `<mission>_<v1>_<v2>..._<tag>` with non-alphanumerics in each part replaced by `-`.
pub fn name_root(mission: &str, case: &ModelCase, tag: &str) -> String {
    std::iter::once(mission)
        .chain(case.values())
        .map(sanitize)
        .chain(std::iter::once(tag.to_string()))
        .collect::<Vec<_>>()
        .join("_")
}

/// One path per line.
fn path_list<'a>(paths: impl Iterator<Item = &'a PathBuf>) -> String {
    paths.fold(String::new(), |mut acc, p| {
        let _ = writeln!(acc, "{}", p.display());
        acc
    })
}

/// Files produced for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedCase {
    pub name_root: String,
    pub include: PathBuf,
    pub script: PathBuf,
    /// Report file GMAT will write when the script runs.
    pub report: PathBuf,
}

/// Outcome of expanding a whole parameter table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Generation {
    pub run_list: PathBuf,
    pub report_list: PathBuf,
    pub generated: Vec<GeneratedCase>,
    pub failures: Vec<(usize, String)>,
}

/// Writes generated models under `<output>/<batch_dir>`.
#[derive(Debug, Clone)]
pub struct ModelWriter {
    output_dir: PathBuf,
    batch_dir: PathBuf,
    config: ModelGenConfig,
    tag: String,
}

impl ModelWriter {
    pub fn new(output_dir: &Path, config: &ModelGenConfig, tag: String) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            batch_dir: output_dir.join(&config.batch_dir),
            config: config.clone(),
            tag,
        }
    }

    pub fn batch_dir(&self) -> &Path {
        &self.batch_dir
    }

    /// Template and include paths are taken relative to the batch directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.batch_dir.join(path)
        }
    }

    /// Text of a case's include file.
    pub fn include_text(&self, case: &ModelCase, name_root: &str) -> String {
        let mut text = format!("GMAT ReportFile1.Filename = 'Report_{name_root}.csv';\n");
        for (name, value) in &case.assignments {
            if self.config.variables.iter().any(|v| v == name) {
                let _ = writeln!(text, "Create Variable {name};");
            }
            let _ = writeln!(text, "GMAT {name} = {value};");
        }
        text
    }

    /// Write the include file and the script for one case.
    ///
    /// The script is created exclusively; an existing one is never overwritten.
    pub fn write_case(&self, case: &ModelCase) -> Result<GeneratedCase, ModelGenError> {
        let root = name_root(&self.config.mission_name, case, &self.tag);
        let include = self.batch_dir.join(format!("{root}.include"));
        let script = self.batch_dir.join(format!("{root}.script"));
        if script.exists() {
            return Err(ModelGenError::ScriptExists(script));
        }

        std::fs::write(&include, self.include_text(case, &root)).map_err(|e| ModelGenError::io(&include, e))?;

        let template = self.resolve(&self.config.template);
        let mut body = std::fs::read_to_string(&template).map_err(|e| ModelGenError::io(&template, e))?;
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        for included in [self.resolve(&self.config.static_include), include.clone(), self.resolve(&self.config.mission_include)] {
            let _ = writeln!(body, "#Include '{}'", included.display());
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&script)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => ModelGenError::ScriptExists(script.clone()),
                _ => ModelGenError::io(&script, e),
            })?;
        file.write_all(body.as_bytes()).map_err(|e| ModelGenError::io(&script, e))?;

        info!(script = %script.display(), "Model script written");
        Ok(GeneratedCase {
            report: self.output_dir.join(format!("Report_{root}.csv")),
            name_root: root,
            include,
            script,
        })
    }

    /// Generate every case of `table` and write the run and report lists.
    ///
    /// A failing case is logged and left out of both lists.
    pub fn generate(&self, table: &ParameterTable) -> Result<Generation, ModelGenError> {
        std::fs::create_dir_all(&self.batch_dir).map_err(|e| ModelGenError::io(&self.batch_dir, e))?;

        let mut generation = Generation {
            run_list: self.output_dir.join(format!("RunList_{}.batch", self.tag)),
            report_list: self.output_dir.join(format!("ReportList_{}.batch", self.tag)),
            ..Generation::default()
        };
        for (i, case) in table.cases.iter().enumerate() {
            match self.write_case(case) {
                Ok(generated) => generation.generated.push(generated),
                Err(e) => {
                    error!(case = i + 1, error = %e, "Model generation failed for case");
                    generation.failures.push((i + 1, e.to_string()));
                }
            }
            info!("Completed {} of {} models", i + 1, table.cases.len());
        }

        let runs = path_list(generation.generated.iter().map(|g| &g.script));
        let reports = path_list(generation.generated.iter().map(|g| &g.report));
        std::fs::write(&generation.run_list, runs).map_err(|e| ModelGenError::io(&generation.run_list, e))?;
        std::fs::write(&generation.report_list, reports)
            .map_err(|e| ModelGenError::io(&generation.report_list, e))?;

        info!(
            run_list = %generation.run_list.display(),
            generated = generation.generated.len(),
            failed = generation.failures.len(),
            "✓ Model generation complete"
        );
        Ok(generation)
    }
}
