//! Core domain logic for the grain dryer log toolkit.
//!
//! This crate contains the fundamental types and logic for:
//! - Time normalization: parsing `DD-MM-YYYY` / `HH:MM:SS` pairs into ordered timestamps
//! - Minute aggregation: collapsing raw samples into one row per minute
//! - Reconciliation: matching sparse lab readings to the dense sensor series
//! - Gap interpolation: filling unmatched readings with provenance tags
//! - Alarm segmentation: turning boolean alarm channels into active intervals
//! - Enrichment: grain type, dry mass and operating mode columns
//! - Pivoting: turning the long-format controller log into wide rows

pub mod aggregate;
pub mod classify;
pub mod enrich;
pub mod interpolate;
pub mod pivot;
pub mod reconcile;
pub mod segment;
pub mod time;
mod types;

pub use aggregate::{AggregationProfile, Reduction, aggregate_by_minute};
pub use classify::{ClassificationRules, GrainClass, Thresholds};
pub use enrich::{EnrichOptions, GRAIN_TYPE_COLUMN, MODE_FLAGS, ReconciledSeries};
pub use interpolate::{Provenance, fill_gaps, interpolate_linear};
pub use pivot::{PivotOptions, Pivoted, RawSample, default_tables, pivot};
pub use reconcile::{
    Assignment, DestinationGroup, EventReading, GreedyNearest, GroupColumns, GroupSchema,
    MatchOutcome, MatchState, MatchStats, MatchStrategy, Reconciler, Reconciliation, RoutedEvent,
};
pub use segment::{AlarmSegment, segment_channel, segment_series};
pub use time::{
    Normalized, RawRow, Timestamped, minutes_offset, normalize, parse_timestamp, seconds_offset,
};
pub use types::{CoreError, Record, Series, Value, round_to};
