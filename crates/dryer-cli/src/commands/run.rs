//! Run command for the full pipeline over a directory of channel tables.
//!
//! Expects the layout written by `dryer pivot` plus a `perten.csv` event
//! table written by `dryer perten`:
//!
//! - `moistures_temps.csv` (required): the base series
//! - `perten.csv` (required): lab readings
//! - `mode.csv`, `settings.csv`, `alarms.csv` (optional)
//!
//! Every table is aggregated per minute with its profile, the base is
//! reconciled against the readings, and the alarm table is segmented.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use dryer_core::Series;

use super::aggregate::{self, AggregateSummary, lookup_profile};
use super::util::save;
use super::{reconcile, segments};
use crate::Config;

const BASE_TABLE: &str = "moistures_temps";
const EVENT_TABLE: &str = "perten.csv";

/// Optional tables and the profile each is aggregated with.
const OPTIONAL_TABLES: [(&str, &str); 3] =
    [("mode", "mode"), ("settings", "settings"), ("alarms", "alarms")];

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory holding the channel tables.
    pub input_dir: PathBuf,

    /// Directory for every output (defaults to the configured output directory).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

fn aggregate_table<W: Write>(
    writer: &mut W,
    config: &Config,
    input: &Path,
    output_dir: &Path,
    table: &str,
    profile: &str,
) -> Result<Series> {
    let profile = lookup_profile(config, profile)?;
    let output = output_dir.join(format!("{table}_optimized.csv"));
    let (series, summary) = aggregate::execute(input, &output, profile)?;

    let AggregateSummary {
        rows,
        minutes,
        dropped,
    } = summary;
    writeln!(
        writer,
        "{table}: aggregated {rows} rows into {minutes} minutes ({dropped} dropped)"
    )?;
    Ok(series)
}

pub fn run<W: Write>(writer: &mut W, args: &RunArgs, config: &Config) -> Result<()> {
    let base_path = args.input_dir.join(format!("{BASE_TABLE}.csv"));
    let events_path = args.input_dir.join(EVENT_TABLE);
    for required in [&base_path, &events_path] {
        if !required.is_file() {
            bail!("missing required input {}", required.display());
        }
    }
    let output_dir = args.output_dir.as_ref().unwrap_or(&config.output_dir);

    let base = aggregate_table(writer, config, &base_path, output_dir, BASE_TABLE, "default")?;

    let mut mode = None;
    let mut alarms = None;
    for (table, profile) in OPTIONAL_TABLES {
        let path = args.input_dir.join(format!("{table}.csv"));
        if !path.is_file() {
            tracing::info!(table, "optional table not found, skipping");
            continue;
        }
        let series = aggregate_table(writer, config, &path, output_dir, table, profile)?;
        match table {
            "mode" => mode = Some(series),
            "alarms" => alarms = Some(series),
            _ => {}
        }
    }

    let offset = config
        .reconcile
        .event_offset()
        .context("invalid reconcile.event_offset_seconds")?;
    let strategy = config
        .reconcile
        .strategy()
        .context("invalid reconcile.cooldown_minutes")?;
    let events = dryer_io::load_events(&events_path, offset)
        .with_context(|| format!("failed to load {}", events_path.display()))?;
    let rows = base.len();
    let reconciled = reconcile::execute(
        config,
        strategy,
        base,
        &events.value,
        mode.as_ref(),
    )?;
    let reconciled_path = output_dir.join("reconciled.csv");
    save(&reconciled_path, |file| {
        dryer_io::write_reconciled(file, &reconciled)
    })?;
    writeln!(
        writer,
        "{}",
        reconcile::describe(&reconciled.reconciliation.stats, rows, events.dropped)
    )?;

    if let Some(alarms) = alarms {
        let offset = config
            .alarms
            .offset()
            .context("invalid alarms.offset_minutes")?;
        let found = segments::execute(&alarms, config, offset)?;
        save(&output_dir.join("alarm_segments.csv"), |file| {
            dryer_io::write_segments(file, &found)
        })?;
        writeln!(writer, "{}", segments::describe(&found))?;
    }

    writeln!(writer, "Wrote outputs to {}", output_dir.display())?;
    Ok(())
}
