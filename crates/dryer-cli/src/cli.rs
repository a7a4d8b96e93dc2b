//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::aggregate::AggregateArgs;
use crate::commands::classify::ClassifyArgs;
use crate::commands::perten::PertenArgs;
use crate::commands::pivot::PivotArgs;
use crate::commands::reconcile::ReconcileArgs;
use crate::commands::run::RunArgs;
use crate::commands::segments::SegmentsArgs;

/// Grain dryer log processing.
///
/// Turns raw controller logs and Perten lab readings into minute-aligned
/// tables, merges lab readings onto the sensor series and extracts alarm
/// intervals.
#[derive(Debug, Parser)]
#[command(name = "dryer", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pivot the long-format controller log into channel tables.
    Pivot(PivotArgs),

    /// Convert a Perten instrument log into an event table.
    Perten(PertenArgs),

    /// Label lab readings as wet, dry or overdry.
    Classify(ClassifyArgs),

    /// Collapse a table to one row per minute.
    Aggregate(AggregateArgs),

    /// Merge lab readings onto a sensor series.
    Reconcile(ReconcileArgs),

    /// Extract alarm intervals from an alarm table.
    Segments(SegmentsArgs),

    /// Run the whole pipeline over a directory of pivoted tables.
    Run(RunArgs),
}
