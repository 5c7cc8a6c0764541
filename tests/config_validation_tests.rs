//! Config Validation Tests
//!
//! Unknown-key detection, range validation and TOML round trips for
//! `AutomationConfig`, exercised independently from the tools that read it.

use gmat_automation::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use gmat_automation::config::{AutomationConfig, ConfigError, ExistingOutput, UnterminatedSection};

// ============================================================================
// Typo Detection Tests
// ============================================================================

#[test]
fn typo_in_batcher_section_warns_with_suggestion() {
    let toml_str = r#"
[batcher]
timout_secs = 300
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("timout_secs"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("batcher.timeout_secs"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[gmat]
executable = "/opt/GMAT/R2022a/bin/GmatConsole"
output_path = "/data/gmat/output"
args = ["-m", "-ns", "-x", "-r"]

[batcher]
timeout_secs = 900
reserved_cpus = 1
start_jitter = false
tail_words = 30
script_suffix = "script"

[reports]
unterminated_section = "flush"
existing_output = "version"
offset_columns = [2, 3, 4]
link_suffixes = ["txt", "xlsx"]
visibility_suffixes = ["txt"]

[modelgen]
template = "Template.script"
parameter_sheet = "Cases"
variables = ["Costate"]
mission_name = "LEO-Survey"

[logging]
file = "gmat_automation.log"
json = true
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce 0 warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );

    let config: AutomationConfig = toml::from_str(toml_str).expect("config should parse");
    assert_eq!(config.reports.unterminated_section, UnterminatedSection::Flush);
    assert_eq!(config.reports.existing_output, ExistingOutput::Version);
    assert!(config.logging.json);
}

#[test]
fn unknown_section_warns() {
    let toml_str = r#"
[server]
addr = "0.0.0.0:8080"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.iter().any(|w| w.field == "server"));
    assert!(warnings.iter().any(|w| w.field == "server.addr"));
}

#[test]
fn empty_toml_produces_zero_warnings() {
    assert!(validate_unknown_keys("").is_empty());
}

#[test]
fn known_keys_set_is_complete() {
    // Every key the default config serializes must be known to the validator
    let toml_str = AutomationConfig::default()
        .to_toml()
        .expect("Default config should serialize");
    let warnings = validate_unknown_keys(&toml_str);
    assert!(
        warnings.is_empty(),
        "Default config serialization should produce 0 unknown-key warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn suggest_correction_returns_none_for_garbage() {
    let known = known_config_keys();
    assert!(suggest_correction("zzz_completely_invalid_xyz_12345", &known).is_none());
}

// ============================================================================
// Range Validation Tests
// ============================================================================

#[test]
fn zero_timeout_is_error() {
    let mut config = AutomationConfig::default();
    config.batcher.timeout_secs = 0;
    let (errors, _) = validate_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("timeout_secs")));
}

#[test]
fn short_timeout_is_warning() {
    let mut config = AutomationConfig::default();
    config.batcher.timeout_secs = 5;
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "batcher.timeout_secs"));
}

#[test]
fn offset_column_zero_is_error() {
    let mut config = AutomationConfig::default();
    config.reports.offset_columns = [0, 1, 2];
    let (errors, _) = validate_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("column 0")));
}

#[test]
fn repeated_offset_column_is_error() {
    let mut config = AutomationConfig::default();
    config.reports.offset_columns = [4, 4, 6];
    let (errors, _) = validate_ranges(&config);
    assert!(errors.iter().any(|e| e.contains("distinct")));
}

#[test]
fn mission_name_with_separator_is_error() {
    let mut config = AutomationConfig::default();
    config.modelgen.mission_name = "runs/leo".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn empty_gmat_args_is_warning_only() {
    let mut config = AutomationConfig::default();
    config.gmat.args.clear();
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "gmat.args"));
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_roundtrip_preserves_values() {
    let mut original = AutomationConfig::default();
    original.batcher.timeout_secs = 1200;
    original.reports.existing_output = ExistingOutput::Skip;
    original.modelgen.variables = vec!["Costate".to_string()];

    let toml_str = original.to_toml().expect("Serialization should work");
    let roundtripped: AutomationConfig = toml::from_str(&toml_str).expect("Deserialization should work");

    assert_eq!(roundtripped.batcher.timeout_secs, 1200);
    assert_eq!(roundtripped.reports.existing_output, ExistingOutput::Skip);
    assert_eq!(roundtripped.modelgen.variables, vec!["Costate"]);
    assert!(roundtripped.validate().is_ok());
}

#[test]
fn save_then_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gmat_automation.toml");
    let mut config = AutomationConfig::default();
    config.batcher.tail_words = 12;
    config.save_to_file(&path).unwrap();

    let loaded = AutomationConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.batcher.tail_words, 12);
}

#[test]
fn load_from_file_rejects_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gmat_automation.toml");
    std::fs::write(&path, "[batcher]\ntail_words = 0\n").unwrap();
    let err = AutomationConfig::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("tail_words"));
}

#[test]
fn load_from_file_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gmat_automation.toml");
    std::fs::write(&path, "[reports]\nexisting_output = \"sometimes\"\n").unwrap();
    assert!(matches!(
        AutomationConfig::load_from_file(&path),
        Err(ConfigError::Parse(..))
    ));
}
