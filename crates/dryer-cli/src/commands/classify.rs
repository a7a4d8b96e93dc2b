//! Classify command for labelling lab readings.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::Args;
use dryer_core::GrainClass;

use super::util::{save, stem};
use crate::Config;

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Event table (`Date, Time, Grain, Moisture, ...`).
    pub input: PathBuf,

    /// Output CSV (defaults to `<input>_classified.csv` in the output directory).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run<W: Write>(writer: &mut W, args: &ClassifyArgs, config: &Config) -> Result<()> {
    let rules = &config.classification;
    rules.validate().context("invalid classification thresholds")?;

    let loaded = dryer_io::load_events(&args.input, Duration::zero())
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let status: Vec<GrainClass> = loaded
        .value
        .iter()
        .map(|e| rules.classify(e.grain.as_deref(), e.moisture))
        .collect();

    let file_name = format!("{}_classified.csv", stem(&args.input));
    let path = config.output_path(args.output.as_deref(), &file_name);
    save(&path, |file| {
        dryer_io::write_events(file, &loaded.value, Some(status.as_slice()))
    })?;

    let count = |class: GrainClass| status.iter().filter(|s| **s == class).count();
    writeln!(
        writer,
        "Classified {} readings: {} wet, {} dry, {} overdry ({} dropped) -> {}",
        status.len(),
        count(GrainClass::Wet),
        count(GrainClass::Dry),
        count(GrainClass::Overdry),
        loaded.dropped,
        path.display()
    )?;
    Ok(())
}
