//! Perten command for converting the instrument log into an event table.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use dryer_io::PertenOptions;

use super::util::save;
use crate::Config;

#[derive(Debug, Args)]
pub struct PertenArgs {
    /// Whitespace-separated Perten log.
    pub input: PathBuf,

    /// Output CSV (defaults to `perten.csv` in the output directory).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Clock correction in seconds, overriding the configured one.
    #[arg(long, allow_hyphen_values = true)]
    pub offset_seconds: Option<i64>,

    /// Test weight multiplier, overriding the configured one.
    #[arg(long)]
    pub nature_scale: Option<f64>,
}

pub fn run<W: Write>(writer: &mut W, args: &PertenArgs, config: &Config) -> Result<()> {
    let options = PertenOptions {
        offset_seconds: args.offset_seconds.unwrap_or(config.perten.offset_seconds),
        nature_scale: args.nature_scale.unwrap_or(config.perten.nature_scale),
    };
    let loaded = dryer_io::load_perten(&args.input, &options)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let path = config.output_path(args.output.as_deref(), "perten.csv");
    save(&path, |file| dryer_io::write_events(file, &loaded.value, None))?;

    writeln!(
        writer,
        "Imported {} readings ({} dropped) to {}",
        loaded.value.len(),
        loaded.dropped,
        path.display()
    )?;
    Ok(())
}
