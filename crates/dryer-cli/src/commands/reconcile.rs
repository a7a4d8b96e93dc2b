//! Reconcile command for merging lab readings into the controller table.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use dryer_core::{
    EventReading, GreedyNearest, MatchStats, ReconciledSeries, Reconciler, Series, minutes_offset,
};

use super::util::{load_series, save};
use crate::Config;

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Per-minute controller table (usually `moistures_temps_optimized.csv`).
    pub base: PathBuf,

    /// Lab reading table (`Date, Time, Grain, Moisture, Nature, Temperature`).
    pub events: PathBuf,

    /// Per-minute mode table used to label each row's operating mode.
    #[arg(long)]
    pub modes: Option<PathBuf>,

    /// Output CSV (defaults to `reconciled.csv` in the output directory).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Grain-change cooldown in minutes, overriding the configured one.
    #[arg(long)]
    pub cooldown_minutes: Option<i64>,
}

/// Reconciles `events` onto `base` and derives the extra columns.
pub fn execute(
    config: &Config,
    strategy: GreedyNearest,
    base: Series,
    events: &[EventReading],
    modes: Option<&Series>,
) -> Result<ReconciledSeries> {
    let reconciler = Reconciler::with_strategy(
        config.reconcile.groups.clone(),
        config.classification.clone(),
        strategy,
    )
    .context("invalid reconciliation settings")?;
    let reconciliation = reconciler
        .reconcile(&base, events)
        .context("failed to reconcile lab readings")?;

    Ok(ReconciledSeries::build(
        base,
        reconciliation,
        modes,
        &config.classification,
        &config.enrich_options(),
    ))
}

/// One-line description of a reconciliation pass.
pub fn describe(stats: &MatchStats, rows: usize, dropped: usize) -> String {
    format!(
        "Reconciled {} readings onto {rows} rows: {} matched, {} unmatched \
         ({} exhausted, {} cooldown, {} unrouted, {dropped} dropped)",
        stats.events,
        stats.matched,
        stats.unmatched(),
        stats.exhausted,
        stats.cooldown_rejected,
        stats.unrouted,
    )
}

pub fn run<W: Write>(writer: &mut W, args: &ReconcileArgs, config: &Config) -> Result<()> {
    let base = load_series(&args.base)?;
    let offset = config
        .reconcile
        .event_offset()
        .context("invalid reconcile.event_offset_seconds")?;
    let events = dryer_io::load_events(&args.events, offset)
        .with_context(|| format!("failed to load {}", args.events.display()))?;
    let modes = args.modes.as_deref().map(load_series).transpose()?;

    let mut strategy = config
        .reconcile
        .strategy()
        .context("invalid reconcile.cooldown_minutes")?;
    if let Some(minutes) = args.cooldown_minutes {
        strategy.cooldown = Some(minutes_offset(minutes).context("invalid --cooldown-minutes")?);
    }

    let rows = base.value.len();
    let reconciled = execute(
        config,
        strategy,
        base.value,
        &events.value,
        modes.as_ref().map(|m| &m.value),
    )?;

    let path = config.output_path(args.output.as_deref(), "reconciled.csv");
    save(&path, |file| dryer_io::write_reconciled(file, &reconciled))?;

    writeln!(
        writer,
        "{} -> {}",
        describe(
            &reconciled.reconciliation.stats,
            rows,
            base.dropped + events.dropped
        ),
        path.display()
    )?;
    Ok(())
}
