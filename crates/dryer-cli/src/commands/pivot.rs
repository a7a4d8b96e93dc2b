//! Pivot command for splitting the controller log into channel tables.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Args;
use dryer_core::pivot;

use super::util::{parse_log_time, save};
use crate::Config;

#[derive(Debug, Args)]
pub struct PivotArgs {
    /// Long-format controller log with `timestamp`, `var_name` and `var_data` columns.
    pub input: PathBuf,

    /// Directory for the channel tables (defaults to the configured output directory).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Skip samples before this time (`YYYY-MM-DD HH:MM:SS`).
    #[arg(long, value_parser = parse_log_time)]
    pub from: Option<NaiveDateTime>,

    /// Skip samples after this time (`YYYY-MM-DD HH:MM:SS`).
    #[arg(long, value_parser = parse_log_time)]
    pub to: Option<NaiveDateTime>,
}

pub fn run<W: Write>(writer: &mut W, args: &PivotArgs, config: &Config) -> Result<()> {
    let samples = dryer_io::read_raw_log(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let total = samples.len();

    let mut options = config.pivot.options();
    if args.from.is_some() || args.to.is_some() {
        let (from, to) = options
            .window
            .unwrap_or((NaiveDateTime::MIN, NaiveDateTime::MAX));
        options.window = Some((args.from.unwrap_or(from), args.to.unwrap_or(to)));
    }

    let pivoted = pivot(samples, &options);
    let output_dir = args.output_dir.as_ref().unwrap_or(&config.output_dir);

    let mut written = Vec::new();
    for (table, columns) in &config.pivot.tables {
        let selected = pivoted.series.select(columns);
        if selected.columns.is_empty() {
            tracing::warn!(table, "no channels of this table appear in the log");
            continue;
        }
        let path = output_dir.join(format!("{table}.csv"));
        save(&path, |file| dryer_io::write_series(file, &selected))?;
        written.push(table.as_str());
    }

    writeln!(
        writer,
        "Pivoted {total} samples into {} rows ({} dropped, {} outside window)",
        pivoted.series.len(),
        pivoted.dropped,
        pivoted.out_of_window
    )?;
    writeln!(
        writer,
        "Wrote {} tables to {}: {}",
        written.len(),
        output_dir.display(),
        written.join(", ")
    )?;
    Ok(())
}
