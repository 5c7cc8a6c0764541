//! Automation Configuration - GMAT runner and report pipeline settings as TOML values
//!
//! Every tunable of the batch runner, the report pipeline and the model generator
//! lives here. Each struct implements `Default` with the values the tools ship
//! with, so a missing config file means stock behaviour.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one automation workstation.
///
/// Load with `AutomationConfig::load()` which searches:
/// 1. `$GMAT_AUTOMATION_CONFIG` env var
/// 2. `./gmat_automation.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Where GMAT lives and how it is launched
    #[serde(default)]
    pub gmat: GmatConfig,

    /// Worker pool sizing and per-script limits
    #[serde(default)]
    pub batcher: BatcherConfig,

    /// Report reduction and correlation policies
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Script variant generation
    #[serde(default)]
    pub modelgen: ModelGenConfig,

    /// Log file output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AutomationConfig {
    /// Load configuration using the standard search order:
    /// 1. `$GMAT_AUTOMATION_CONFIG` environment variable
    /// 2. `./gmat_automation.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded automation config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", defaults::CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./gmat_automation.toml
        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded automation config from ./{}", defaults::CONFIG_FILE_NAME);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::CONFIG_FILE_NAME);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", defaults::CONFIG_FILE_NAME);
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys are reported as warnings; range and consistency problems
    /// are returned as a `ConfigError::Validation`.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file (used by `config --init`).
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Automation config saved");
        Ok(())
    }

    /// Validate all settings for internal consistency.
    ///
    /// Rules:
    /// - Timeouts and word counts must be positive
    /// - Offset columns must be three distinct columns right of the timestamp
    /// - Batch list suffixes must not be empty
    /// - The mission name must be usable inside a file name
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// GMAT Executable
// ============================================================================

/// Location and launch flags of the GMAT executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmatConfig {
    /// Explicit executable path. Skips the directory search when set.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Directory searched recursively for the executable.
    #[serde(default)]
    pub search_root: Option<PathBuf>,

    /// File names that count as a GMAT executable.
    #[serde(default = "default_executable_names")]
    pub executable_names: Vec<String>,

    /// Output directory override. Otherwise read from `gmat_startup_file.txt`.
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Flags placed before the script path.
    #[serde(default = "default_gmat_args")]
    pub args: Vec<String>,
}

fn default_executable_names() -> Vec<String> {
    defaults::GMAT_EXECUTABLE_NAMES.iter().map(|s| (*s).to_string()).collect()
}
fn default_gmat_args() -> Vec<String> {
    defaults::GMAT_ARGS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for GmatConfig {
    fn default() -> Self {
        Self {
            executable: None,
            search_root: None,
            executable_names: default_executable_names(),
            output_path: None,
            args: default_gmat_args(),
        }
    }
}

// ============================================================================
// Batch Runner
// ============================================================================

/// Worker pool sizing and per-script limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatcherConfig {
    /// Wall clock limit for one GMAT run (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Logical CPUs left free. Pool size is `cpus - reserved_cpus`, at least 1.
    #[serde(default = "default_reserved_cpus")]
    pub reserved_cpus: usize,

    /// Sleep a short random interval before launching each run.
    #[serde(default = "default_true")]
    pub start_jitter: bool,

    /// Trailing words of GMAT output kept in each run report.
    #[serde(default = "default_tail_words")]
    pub tail_words: usize,

    /// Only run-list entries with this suffix are launched.
    #[serde(default = "default_script_suffix")]
    pub script_suffix: String,
}

fn default_timeout_secs() -> u64 { defaults::BATCH_TIMEOUT_SECS }
fn default_reserved_cpus() -> usize { defaults::BATCH_RESERVED_CPUS }
fn default_true() -> bool { true }
fn default_tail_words() -> usize { defaults::BATCH_TAIL_WORDS }
fn default_script_suffix() -> String { defaults::BATCH_SCRIPT_SUFFIX.to_string() }

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            reserved_cpus: default_reserved_cpus(),
            start_jitter: true,
            tail_words: default_tail_words(),
            script_suffix: default_script_suffix(),
        }
    }
}

// ============================================================================
// Report Pipeline
// ============================================================================

/// What to do with a visibility section still open at end of input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnterminatedSection {
    /// Drop the collected windows and log a warning.
    #[default]
    Discard,
    /// Commit the collected windows as if the section had been closed.
    Flush,
}

/// What to do when an output workbook already exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExistingOutput {
    /// Replace the existing workbook.
    #[default]
    Overwrite,
    /// Keep the existing workbook and skip the input.
    Skip,
    /// Write `<stem>_<n>.xlsx` with the first free `n`.
    Version,
}

/// Report reduction and correlation policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default)]
    pub unterminated_section: UnterminatedSection,

    #[serde(default)]
    pub existing_output: ExistingOutput,

    /// X/Y/Z columns used when link report headings don't identify them.
    #[serde(default = "default_offset_columns")]
    pub offset_columns: [usize; 3],

    /// Accepted suffixes in a link report batch list.
    #[serde(default = "default_link_suffixes")]
    pub link_suffixes: Vec<String>,

    /// Accepted suffixes in a visibility report batch list.
    #[serde(default = "default_visibility_suffixes")]
    pub visibility_suffixes: Vec<String>,
}

fn default_offset_columns() -> [usize; 3] { defaults::OFFSET_COLUMNS }
fn default_link_suffixes() -> Vec<String> {
    defaults::LINK_SUFFIXES.iter().map(|s| (*s).to_string()).collect()
}
fn default_visibility_suffixes() -> Vec<String> {
    defaults::VISIBILITY_SUFFIXES.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            unterminated_section: UnterminatedSection::default(),
            existing_output: ExistingOutput::default(),
            offset_columns: default_offset_columns(),
            link_suffixes: default_link_suffixes(),
            visibility_suffixes: default_visibility_suffixes(),
        }
    }
}

// ============================================================================
// Model Generation
// ============================================================================

/// Script variant generation from a parameter table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelGenConfig {
    /// Mission script copied for every case.
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Included before the case parameters.
    #[serde(default = "default_static_include")]
    pub static_include: PathBuf,

    /// Included after the case parameters.
    #[serde(default = "default_mission_include")]
    pub mission_include: PathBuf,

    /// Sub-directory of the output path receiving generated files.
    #[serde(default = "default_batch_dir")]
    pub batch_dir: String,

    /// Worksheet holding the parameter table. First sheet when unset.
    #[serde(default)]
    pub parameter_sheet: Option<String>,

    /// Parameters that are script variables and need a `Create Variable` line.
    #[serde(default)]
    pub variables: Vec<String>,

    /// Leading component of every generated file name.
    #[serde(default = "default_mission_name")]
    pub mission_name: String,
}

fn default_template() -> PathBuf { PathBuf::from(defaults::MODELGEN_TEMPLATE) }
fn default_static_include() -> PathBuf { PathBuf::from(defaults::MODELGEN_STATIC_INCLUDE) }
fn default_mission_include() -> PathBuf { PathBuf::from(defaults::MODELGEN_MISSION_INCLUDE) }
fn default_batch_dir() -> String { defaults::MODELGEN_BATCH_DIR.to_string() }
fn default_mission_name() -> String { "Mission".to_string() }

impl Default for ModelGenConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            static_include: default_static_include(),
            mission_include: default_mission_include(),
            batch_dir: default_batch_dir(),
            parameter_sheet: None,
            variables: Vec::new(),
            mission_name: default_mission_name(),
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Append log output to this file in addition to the console.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Write the log file as JSON lines instead of plain text.
    #[serde(default)]
    pub json: bool,
}
