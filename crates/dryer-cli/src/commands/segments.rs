//! Segments command for turning alarm flags into intervals.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::Args;
use dryer_core::{AlarmSegment, Series, minutes_offset, segment_series};

use super::util::{load_series, save};
use crate::Config;

#[derive(Debug, Args)]
pub struct SegmentsArgs {
    /// Per-minute alarm table (usually `alarms_optimized.csv`).
    pub input: PathBuf,

    /// Output CSV (defaults to `alarm_segments.csv` in the output directory).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Clock correction in minutes, overriding the configured one.
    #[arg(long, allow_hyphen_values = true)]
    pub offset_minutes: Option<i64>,
}

/// Segments the configured alarm channels present in `series`.
pub fn execute(series: &Series, config: &Config, offset: Duration) -> Result<Vec<AlarmSegment>> {
    let channels: Vec<String> = config
        .alarms
        .channels
        .iter()
        .filter(|channel| {
            let present = series.has_column(channel);
            if !present {
                tracing::warn!(channel = %channel, "alarm channel not in table, skipping");
            }
            present
        })
        .cloned()
        .collect();

    let mut segments = segment_series(series, &channels).context("failed to segment alarms")?;
    for segment in &mut segments {
        segment
            .shift(offset)
            .with_context(|| format!("failed to shift {} segment", segment.channel))?;
    }
    Ok(segments)
}

/// One-line description of a segmentation pass.
pub fn describe(segments: &[AlarmSegment]) -> String {
    let mut channels: Vec<&str> = segments.iter().map(|s| s.channel.as_str()).collect();
    channels.dedup();
    format!(
        "Found {} alarm segments ({} open-ended) across {} channels",
        segments.len(),
        segments.iter().filter(|s| s.is_open_ended).count(),
        channels.len()
    )
}

pub fn run<W: Write>(writer: &mut W, args: &SegmentsArgs, config: &Config) -> Result<()> {
    let loaded = load_series(&args.input)?;
    let offset = match args.offset_minutes {
        Some(minutes) => minutes_offset(minutes).context("invalid --offset-minutes")?,
        None => config.alarms.offset().context("invalid alarms.offset_minutes")?,
    };
    let segments = execute(&loaded.value, config, offset)?;

    let path = config.output_path(args.output.as_deref(), "alarm_segments.csv");
    save(&path, |file| dryer_io::write_segments(file, &segments))?;

    writeln!(writer, "{} -> {}", describe(&segments), path.display())?;
    Ok(())
}
