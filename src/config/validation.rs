//! Config checks run around the typed parse.
//!
//! Before serde sees the file, its raw key paths are compared with the keys
//! the config structs define; strays become warnings with the nearest known
//! key as a suggestion. After the parse, `validate_ranges` rejects values the
//! runner and report pipeline can't work with.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `AutomationConfig`.
///
/// Maintained by hand to match the struct hierarchy in automation_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [gmat]
        "gmat",
        "gmat.executable",
        "gmat.search_root",
        "gmat.executable_names",
        "gmat.output_path",
        "gmat.args",
        // [batcher]
        "batcher",
        "batcher.timeout_secs",
        "batcher.reserved_cpus",
        "batcher.start_jitter",
        "batcher.tail_words",
        "batcher.script_suffix",
        // [reports]
        "reports",
        "reports.unterminated_section",
        "reports.existing_output",
        "reports.offset_columns",
        "reports.link_suffixes",
        "reports.visibility_suffixes",
        // [modelgen]
        "modelgen",
        "modelgen.template",
        "modelgen.static_include",
        "modelgen.mission_include",
        "modelgen.batch_dir",
        "modelgen.parameter_sheet",
        "modelgen.variables",
        "modelgen.mission_name",
        // [logging]
        "logging",
        "logging.file",
        "logging.json",
    ];
    keys.iter().copied().collect()
}

/// Largest edit distance at which an unknown key still gets a suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 3;

// ============================================================================
// Key paths
// ============================================================================

/// Every table and leaf key of `value` as a dotted path, tables before their
/// children: `[batcher]\ntimeout_secs = 1` gives `batcher`, `batcher.timeout_secs`.
pub fn dotted_keys(value: &toml::Value) -> Vec<String> {
    let mut keys = Vec::new();
    let mut pending: Vec<(String, &toml::Value)> = vec![(String::new(), value)];
    while let Some((prefix, value)) = pending.pop() {
        let Some(table) = value.as_table() else {
            continue;
        };
        for (name, child) in table {
            let path = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
            if child.is_table() {
                pending.push((path.clone(), child));
            }
            keys.push(path);
        }
    }
    keys
}

/// Insertions, deletions and substitutions needed to turn `a` into `b`.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

/// The known key nearest to `unknown`, alphabetically first on ties.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|key| (edit_distance(unknown, key), *key))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min()
        .map(|(_, key)| key.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for keys the config structs don't define. Never an error.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // reported by the typed parse
    };

    let known = known_config_keys();
    dotted_keys(&value)
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate ranges and consistency on a parsed `AutomationConfig`.
///
/// Returns (errors, warnings). Errors are unusable values that must prevent
/// startup; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &super::AutomationConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let b = &config.batcher;
    if b.timeout_secs == 0 {
        errors.push("batcher.timeout_secs must be > 0".to_string());
    } else if b.timeout_secs < 10 {
        warnings.push(ValidationWarning {
            field: "batcher.timeout_secs".to_string(),
            message: format!(
                "batcher.timeout_secs = {} is shorter than a typical GMAT start-up",
                b.timeout_secs
            ),
            suggestion: None,
        });
    }
    if b.tail_words == 0 {
        errors.push("batcher.tail_words must be > 0".to_string());
    }
    if b.script_suffix.trim().is_empty() {
        errors.push("batcher.script_suffix cannot be empty".to_string());
    }

    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    if b.reserved_cpus >= cpus {
        warnings.push(ValidationWarning {
            field: "batcher.reserved_cpus".to_string(),
            message: format!(
                "batcher.reserved_cpus = {} leaves no free CPU out of {cpus}; running one script at a time",
                b.reserved_cpus
            ),
            suggestion: None,
        });
    }

    if config.gmat.args.is_empty() {
        warnings.push(ValidationWarning {
            field: "gmat.args".to_string(),
            message: "gmat.args is empty; GMAT will open the script without running it".to_string(),
            suggestion: None,
        });
    }
    if config.gmat.executable.is_none() && config.gmat.executable_names.is_empty() {
        errors.push("gmat.executable_names cannot be empty when gmat.executable is unset".to_string());
    }

    let r = &config.reports;
    let [x, y, z] = r.offset_columns;
    if x == 0 || y == 0 || z == 0 {
        errors.push(format!(
            "reports.offset_columns = {:?} cannot use column 0 (timestamp column)",
            r.offset_columns
        ));
    }
    if x == y || y == z || x == z {
        errors.push(format!(
            "reports.offset_columns = {:?} must name three distinct columns",
            r.offset_columns
        ));
    }
    if r.link_suffixes.is_empty() {
        errors.push("reports.link_suffixes cannot be empty".to_string());
    }
    if r.visibility_suffixes.is_empty() {
        errors.push("reports.visibility_suffixes cannot be empty".to_string());
    }

    let name = &config.modelgen.mission_name;
    if name.is_empty() || name.contains(['/', '\\', ':']) {
        errors.push(format!(
            "modelgen.mission_name = '{name}' must be a non-empty file name component"
        ));
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutomationConfig;

    #[test]
    fn test_edit_distance_identical() {
        assert_eq!(edit_distance("hello", "hello"), 0);
    }

    #[test]
    fn test_edit_distance_one_edit() {
        assert_eq!(edit_distance("timout_secs", "timeout_secs"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_edit_distance_empty() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
    }

    #[test]
    fn test_dotted_keys_nested() {
        let toml: toml::Value = r#"
            [batcher]
            timeout_secs = 60
        "#
        .parse()
        .unwrap();
        assert_eq!(dotted_keys(&toml), vec!["batcher", "batcher.timeout_secs"]);
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[batcher]
timout_secs = 60
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("timout_secs"));
        assert_eq!(warnings[0].suggestion.as_deref(), Some("batcher.timeout_secs"));
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[gmat]
executable = "/opt/gmat/bin/GmatConsole"

[reports]
existing_output = "skip"
offset_columns = [7, 8, 9]

[logging]
file = "gmat_automation.log"
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[plotting]\nenabled = true\n");
        assert!(warnings.iter().any(|w| w.field == "plotting"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_ranges_defaults_clean() {
        let (errors, _) = validate_ranges(&AutomationConfig::default());
        assert!(errors.is_empty(), "defaults must validate: {errors:?}");
    }

    #[test]
    fn test_ranges_offset_columns_must_be_distinct() {
        let mut config = AutomationConfig::default();
        config.reports.offset_columns = [4, 4, 6];
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("distinct")));
    }

    #[test]
    fn test_ranges_offset_columns_reject_timestamp_column() {
        let mut config = AutomationConfig::default();
        config.reports.offset_columns = [0, 5, 6];
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("column 0")));
    }

    #[test]
    fn test_ranges_short_timeout_is_warning() {
        let mut config = AutomationConfig::default();
        config.batcher.timeout_secs = 5;
        let (errors, warnings) = validate_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "batcher.timeout_secs"));
    }

    #[test]
    fn test_ranges_mission_name_with_separator() {
        let mut config = AutomationConfig::default();
        config.modelgen.mission_name = "a/b".to_string();
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("mission_name")));
    }
}
