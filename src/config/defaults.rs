//! System-wide default constants.
//!
//! Centralises the magic numbers of the batch runner and the report pipeline.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Configuration Discovery
// ============================================================================

/// Environment variable holding an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "GMAT_AUTOMATION_CONFIG";

/// Config file looked up in the current working directory.
pub const CONFIG_FILE_NAME: &str = "gmat_automation.toml";

// ============================================================================
// GMAT Executable
// ============================================================================

/// Command-line flags GMAT is launched with, followed by the script path.
///
/// `-m` minimized, `-ns` no splash, `-x` exit when done, `-r` run script.
pub const GMAT_ARGS: [&str; 4] = ["-m", "-ns", "-x", "-r"];

/// Executable names searched for when no explicit path is configured.
pub const GMAT_EXECUTABLE_NAMES: [&str; 3] = ["GMAT.exe", "GmatConsole", "GMAT"];

/// Startup file written by GMAT next to its executable.
pub const GMAT_STARTUP_FILE: &str = "gmat_startup_file.txt";

/// Key in the startup file naming the default output directory.
pub const GMAT_OUTPUT_PATH_KEY: &str = "OUTPUT_PATH";

// ============================================================================
// Batch Runner
// ============================================================================

/// Per-script wall clock limit (seconds).
pub const BATCH_TIMEOUT_SECS: u64 = 600;

/// Logical CPUs kept free for the rest of the machine.
pub const BATCH_RESERVED_CPUS: usize = 2;

/// Number of trailing words of GMAT output kept in a run report.
pub const BATCH_TAIL_WORDS: usize = 20;

/// Suffix of runnable entries in a run list.
pub const BATCH_SCRIPT_SUFFIX: &str = "script";

/// Start jitter numerator range (inclusive).
pub const JITTER_NUMERATOR: (u32, u32) = (1, 5);

/// Start jitter denominator range (inclusive). Jitter is `n / d` seconds.
pub const JITTER_DENOMINATOR: (u32, u32) = (7, 11);

// ============================================================================
// Report Pipeline
// ============================================================================

/// Sheet holding the formatted data of a link (or generic) report workbook.
pub const REPORT_SHEET_NAME: &str = "Report";

/// Fallback X/Y/Z offset columns of a link report when headings don't name them.
pub const OFFSET_COLUMNS: [usize; 3] = [4, 5, 6];

/// Suffixes accepted in a link report batch list.
pub const LINK_SUFFIXES: [&str; 3] = ["txt", "csv", "xlsx"];

/// Suffixes accepted in a visibility report batch list.
pub const VISIBILITY_SUFFIXES: [&str; 2] = ["txt", "csv"];

/// Fractional digits at or above which a decimal is shown with 4 places.
pub const PRECISE_DECIMAL_DIGITS: usize = 4;

/// Excel display format for GMAT UTC Gregorian timestamps.
pub const DATETIME_NUM_FORMAT: &str = "d mmm yyyy hh:mm:ss.000";

/// Longest sheet name Excel accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Widest column the emitter will size to (Excel character units).
pub const MAX_COLUMN_WIDTH: f64 = 60.0;

/// Headings longer than this are wrapped instead of widening the column.
pub const HEADING_WRAP_LEN: usize = 16;

// ============================================================================
// Model Generation
// ============================================================================

/// Mission template copied for every generated case.
pub const MODELGEN_TEMPLATE: &str = "ModelMissionTemplate.script";

/// Static resource definitions included first by every case.
pub const MODELGEN_STATIC_INCLUDE: &str = "StaticDefinitions.script";

/// Mission sequence included last by every case.
pub const MODELGEN_MISSION_INCLUDE: &str = "MissionDefinitions.script";

/// Sub-directory of the output path receiving generated files.
pub const MODELGEN_BATCH_DIR: &str = "Batch";

/// Time tag appended to generated names (UTC day-of-year, hour, minute, second).
pub const MODELGEN_TIME_TAG: &str = "J%j_%H%M%S";
