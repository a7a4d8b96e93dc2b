//! End-to-end tests driving the `dryer` binary.
//!
//! Covers the full pipeline: pivot → perten → run.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONTROLLER_LOG: &str = "timestamp,var_name,var_data,measured
2024-08-10 09:00:05.250,DROPS_SCORE,1,1
2024-08-10 09:00:05.250,TOP_TEMP,60,1
2024-08-10 09:00:05.250,DRYING,true,1
2024-08-10 09:00:05.250,GENERAL_ALARM,false,1
2024-08-10 09:01:05,DROPS_SCORE,2,1
2024-08-10 09:01:05,TOP_TEMP,61,1
2024-08-10 09:01:05,GENERAL_ALARM,true,1
garbage,TOP_TEMP,1,1
";

const PERTEN_LOG: &str = "10-08-2024 09:00:20 wheat 1 13.0 70 20.5
10-08-2024 09:00:40 short line
";

/// Runs `dryer` isolated from the user's configuration.
fn dryer(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dryer"))
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run dryer")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "dryer should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_pivot_perten_run_pipeline() {
    let temp = TempDir::new().unwrap();
    let tables = temp.path().join("tables");
    let output = temp.path().join("output");
    let log = temp.path().join("dryer_data.csv");
    let perten = temp.path().join("perten.txt");
    std::fs::write(&log, CONTROLLER_LOG).unwrap();
    std::fs::write(&perten, PERTEN_LOG).unwrap();

    let pivoted = dryer(
        temp.path(),
        &["pivot", path_arg(&log), "--output-dir", path_arg(&tables)],
    );
    assert_success(&pivoted);
    let stdout = String::from_utf8_lossy(&pivoted.stdout);
    assert!(stdout.contains("Pivoted 8 samples into 2 rows (1 dropped, 0 outside window)"));
    assert!(tables.join("moistures_temps.csv").is_file());

    let imported = dryer(
        temp.path(),
        &[
            "perten",
            path_arg(&perten),
            "--output",
            path_arg(&tables.join("perten.csv")),
        ],
    );
    assert_success(&imported);
    assert!(String::from_utf8_lossy(&imported.stdout).starts_with("Imported 1 readings (1 dropped)"));

    let run = dryer(
        temp.path(),
        &["run", path_arg(&tables), "--output-dir", path_arg(&output)],
    );
    assert_success(&run);
    let stdout = String::from_utf8_lossy(&run.stdout);
    assert!(stdout.contains("Reconciled 1 readings onto 2 rows: 1 matched, 0 unmatched"));
    assert!(stdout.contains("Found 1 alarm segments (1 open-ended) across 1 channels"));

    for name in [
        "moistures_temps_optimized.csv",
        "mode_optimized.csv",
        "settings_optimized.csv",
        "alarms_optimized.csv",
        "reconciled.csv",
        "alarm_segments.csv",
    ] {
        assert!(output.join(name).is_file(), "{name} should be written");
    }

    let reconciled = std::fs::read_to_string(output.join("reconciled.csv")).unwrap();
    let rows: Vec<&str> = reconciled.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].ends_with("provenance,dry_mass,mode"));
    assert!(rows[1].starts_with("10-08-2024,09:00:00,wheat,"));
    assert!(rows[1].ends_with(",real,0,DRYING"));
    assert!(rows[2].contains(",calculated,"));

    let segments = std::fs::read_to_string(output.join("alarm_segments.csv")).unwrap();
    assert_eq!(
        segments,
        "Alarm_Type,Start,End,Duration_minutes,Open_Ended\n\
         GENERAL_ALARM,10-08-2024 09:01:00,10-08-2024 09:01:00,0.0,true\n"
    );
}

#[test]
fn test_config_file_shifts_segments() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("alarms_optimized.csv");
    let output = temp.path().join("segments.csv");
    let config = temp.path().join("dryer.toml");
    std::fs::write(
        &input,
        "Date,Time,GENERAL_ALARM\n\
         10-08-2024,06:00:00,true\n\
         10-08-2024,06:01:00,true\n\
         10-08-2024,06:02:00,false\n",
    )
    .unwrap();
    std::fs::write(&config, "[alarms]\noffset_minutes = 180\n").unwrap();

    let result = dryer(
        temp.path(),
        &[
            "--config",
            path_arg(&config),
            "segments",
            path_arg(&input),
            "-o",
            path_arg(&output),
        ],
    );
    assert_success(&result);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Alarm_Type,Start,End,Duration_minutes,Open_Ended\n\
         GENERAL_ALARM,10-08-2024 09:00:00,10-08-2024 09:01:00,1.0,false\n"
    );
}

#[test]
fn test_missing_input_fails() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.csv");

    let result = dryer(temp.path(), &["segments", path_arg(&missing)]);
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("failed to load"), "stderr: {stderr}");
    assert!(stderr.contains("missing.csv"), "stderr: {stderr}");
}

#[test]
fn test_unknown_profile_fails() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("mode.csv");
    std::fs::write(&input, "Date,Time,DRYING\n10-08-2024,06:00:00,true\n").unwrap();

    let result = dryer(
        temp.path(),
        &["aggregate", path_arg(&input), "--profile", "hourly"],
    );
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("unknown aggregation profile \"hourly\""),
        "stderr: {stderr}"
    );
}

#[test]
fn test_no_command_prints_help() {
    let temp = TempDir::new().unwrap();
    let result = dryer(temp.path(), &[]);
    assert_success(&result);
    assert!(String::from_utf8_lossy(&result.stdout).contains("Usage: dryer"));
}
