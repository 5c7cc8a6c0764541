//! Model Generator Integration Tests
//!
//! Expands a parameter table into scripts and checks that the run list it
//! writes is accepted by the batch runner's list loader.

use std::path::Path;

use chrono::{TimeZone, Utc};
use gmat_automation::batcher::load_scripts;
use gmat_automation::config::ModelGenConfig;
use gmat_automation::modelgen::{read_parameter_table, time_tag};
use gmat_automation::ModelWriter;

fn stage_templates(batch_dir: &Path) {
    std::fs::create_dir_all(batch_dir).unwrap();
    std::fs::write(
        batch_dir.join("ModelMissionTemplate.script"),
        "Create Spacecraft Sat1;\nCreate ReportFile ReportFile1;\n",
    )
    .unwrap();
    std::fs::write(batch_dir.join("StaticDefinitions.script"), "Create Propagator Prop;\n").unwrap();
    std::fs::write(batch_dir.join("MissionDefinitions.script"), "BeginMissionSequence;\n").unwrap();
}

#[test]
fn parameter_table_to_run_list() {
    let dir = tempfile::tempdir().unwrap();
    let table_path = dir.path().join("cases.csv");
    std::fs::write(
        &table_path,
        "Sat1.SMA,Sat1.INC,Costate\n7000,28.5,0.1\n7100,51.6,0.2\n7200,97.8,0.3\n",
    )
    .unwrap();

    let config = ModelGenConfig {
        variables: vec!["Costate".to_string()],
        mission_name: "Survey".to_string(),
        ..ModelGenConfig::default()
    };
    let tag = time_tag(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    assert_eq!(tag, "J061_120000");

    let writer = ModelWriter::new(dir.path(), &config, tag);
    stage_templates(writer.batch_dir());

    let table = read_parameter_table(&table_path, None).unwrap();
    let generation = writer.generate(&table).unwrap();
    assert_eq!(generation.generated.len(), 3);
    assert!(generation.failures.is_empty());

    let first = &generation.generated[0];
    assert_eq!(first.name_root, "Survey_7000_28-5_0-1_J061_120000");
    let include = std::fs::read_to_string(&first.include).unwrap();
    assert!(include.starts_with("GMAT ReportFile1.Filename = 'Report_Survey_7000_28-5_0-1_J061_120000.csv';"));
    assert!(include.contains("Create Variable Costate;\nGMAT Costate = 0.1;"));
    assert!(!include.contains("Create Variable Sat1.SMA"));

    let scripts = load_scripts(&generation.run_list, "script").unwrap();
    assert_eq!(scripts.len(), 3);
    assert_eq!(scripts[2], generation.generated[2].script);

    let reports = std::fs::read_to_string(&generation.report_list).unwrap();
    assert!(reports.lines().all(|l| l.ends_with(".csv")));
}

#[test]
fn rerun_with_same_tag_never_overwrites_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let table_path = dir.path().join("cases.csv");
    std::fs::write(&table_path, "Sat1.SMA\n7000\n").unwrap();

    let config = ModelGenConfig::default();
    let writer = ModelWriter::new(dir.path(), &config, "J061_120000".to_string());
    stage_templates(writer.batch_dir());
    let table = read_parameter_table(&table_path, None).unwrap();

    let first = writer.generate(&table).unwrap();
    let script = first.generated[0].script.clone();
    std::fs::write(&script, "edited by hand").unwrap();

    let second = writer.generate(&table).unwrap();
    assert!(second.generated.is_empty());
    assert_eq!(second.failures.len(), 1);
    assert_eq!(std::fs::read_to_string(&script).unwrap(), "edited by hand");
}

#[test]
fn missing_template_fails_each_case() {
    let dir = tempfile::tempdir().unwrap();
    let table_path = dir.path().join("cases.csv");
    std::fs::write(&table_path, "Sat1.SMA\n7000\n7100\n").unwrap();

    let writer = ModelWriter::new(dir.path(), &ModelGenConfig::default(), "J061_120000".to_string());
    let table = read_parameter_table(&table_path, None).unwrap();
    let generation = writer.generate(&table).unwrap();
    assert_eq!(generation.failures.len(), 2);
    assert_eq!(std::fs::read_to_string(&generation.run_list).unwrap(), "");
}
