//! Aggregate command for collapsing a table to one row per minute.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use dryer_core::{AggregationProfile, Series, aggregate_by_minute};

use super::util::{load_series, save, stem};
use crate::Config;

#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Table with `Date` and `Time` columns.
    pub input: PathBuf,

    /// Aggregation profile from the configuration.
    #[arg(short, long, default_value = "default")]
    pub profile: String,

    /// Output CSV (defaults to `<input>_optimized.csv` in the output directory).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Looks up a configured profile, listing the known ones on failure.
pub fn lookup_profile<'a>(config: &'a Config, name: &str) -> Result<&'a AggregationProfile> {
    config.profile(name).with_context(|| {
        let known: Vec<&str> = config.aggregation.keys().map(String::as_str).collect();
        format!(
            "unknown aggregation profile {name:?} (known: {})",
            known.join(", ")
        )
    })
}

/// Row counts of one aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSummary {
    pub rows: usize,
    pub minutes: usize,
    pub dropped: usize,
}

/// Loads, aggregates and writes one table.
pub fn execute(
    input: &Path,
    output: &Path,
    profile: &AggregationProfile,
) -> Result<(Series, AggregateSummary)> {
    let loaded = load_series(input)?;
    let aggregated = aggregate_by_minute(&loaded.value, profile);
    save(output, |file| dryer_io::write_series(file, &aggregated))?;

    let summary = AggregateSummary {
        rows: loaded.value.len(),
        minutes: aggregated.len(),
        dropped: loaded.dropped,
    };
    Ok((aggregated, summary))
}

pub fn run<W: Write>(writer: &mut W, args: &AggregateArgs, config: &Config) -> Result<()> {
    let profile = lookup_profile(config, &args.profile)?;
    let file_name = format!("{}_optimized.csv", stem(&args.input));
    let path = config.output_path(args.output.as_deref(), &file_name);

    let (_, summary) = execute(&args.input, &path, profile)?;
    writeln!(
        writer,
        "Aggregated {} rows into {} minutes ({} dropped) -> {}",
        summary.rows,
        summary.minutes,
        summary.dropped,
        path.display()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    const MODE: &str = "Date,Time,DROPS_SCORE,FILLING,DRYING,COOLING
10-08-2024,09:00:05,7,true,false,false
10-08-2024,09:00:40,,false,true,false
10-08-2024,09:01:10,8,false,true,
10-08-2024,9:01,8,false,false,true
";

    fn args(temp: &tempfile::TempDir, profile: &str) -> AggregateArgs {
        let input = temp.path().join("mode.csv");
        std::fs::write(&input, MODE).unwrap();
        AggregateArgs {
            input,
            profile: profile.to_string(),
            output: None,
        }
    }

    fn config(temp: &tempfile::TempDir) -> Config {
        Config {
            output_dir: temp.path().join("output"),
            ..Config::default()
        }
    }

    #[test]
    fn test_mode_profile_keeps_settled_flags() {
        let temp = tempfile::tempdir().unwrap();
        let mut summary = Vec::new();
        run(&mut summary, &args(&temp, "mode"), &config(&temp)).unwrap();

        let summary = String::from_utf8(summary).unwrap();
        let summary = summary.replace(&temp.path().display().to_string(), "[TEMP]");
        assert_snapshot!(summary, @"Aggregated 3 rows into 2 minutes (1 dropped) -> [TEMP]/output/mode_optimized.csv");

        let table = std::fs::read_to_string(temp.path().join("output/mode_optimized.csv")).unwrap();
        assert_snapshot!(table, @r"
        Date,Time,DROPS_SCORE,FILLING,DRYING,COOLING
        10-08-2024,09:00:00,7,false,true,false
        10-08-2024,09:01:00,8,false,true,
        ");
    }

    #[test]
    fn test_unknown_profile_lists_known_ones() {
        let temp = tempfile::tempdir().unwrap();
        let err = run(&mut Vec::new(), &args(&temp, "hourly"), &config(&temp)).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"unknown aggregation profile "hourly" (known: alarms, default, mode, settings)"#
        );
    }
}
