//! Long-format controller log pivot.
//!
//! The dryer controller exports one line per sample: a timestamp, a
//! variable name and its value. Pivoting merges every sample sharing a
//! timestamp into one wide row, with one column per variable.
//!
//! # Algorithm Summary
//!
//! 1. Parse each timestamp (fractional seconds dropped); drop bad rows
//! 2. Drop samples outside the optional window
//! 3. Merge samples by identical timestamp; a later sample of the same
//!    variable overwrites an earlier one
//! 4. Convert duration channels from `PT#M#S` to seconds
//! 5. Sort rows ascending

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{Record, Series, Value};

/// Timestamp format of the controller log.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Pre-compiled regex for ISO-8601 time-only durations.
static ISO_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").unwrap());

/// One sample of the long-format log, as read from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub timestamp: String,
    pub name: String,
    pub data: String,
}

/// Pivot parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PivotOptions {
    /// Inclusive `[from, to]` window; samples outside it are skipped.
    #[serde(default)]
    pub window: Option<(NaiveDateTime, NaiveDateTime)>,
    /// Channels whose values are ISO-8601 durations.
    #[serde(default = "default_duration_channels")]
    pub duration_channels: Vec<String>,
}

fn default_duration_channels() -> Vec<String> {
    vec!["DROPS_SET_TIMER".to_string()]
}

impl PivotOptions {
    fn in_window(&self, at: NaiveDateTime) -> bool {
        self.window
            .is_none_or(|(from, to)| (from..=to).contains(&at))
    }
}

/// Result of a pivot.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivoted {
    /// One row per distinct timestamp; columns in order of first appearance.
    pub series: Series,
    /// Samples dropped for an unparseable timestamp.
    pub dropped: usize,
    /// Samples skipped for falling outside the window.
    pub out_of_window: usize,
}

/// Parses a controller log timestamp, ignoring fractional seconds.
pub fn parse_log_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim().trim_matches('"');
    let whole = trimmed.split_once('.').map_or(trimmed, |(head, _)| head);
    NaiveDateTime::parse_from_str(whole, LOG_TIMESTAMP_FORMAT).ok()
}

/// Converts an ISO-8601 duration such as `PT5M30S` to whole seconds.
///
/// Only hour, minute and second components are accepted, and at least one
/// must be present.
pub fn parse_iso_duration(raw: &str) -> Option<u64> {
    let caps = ISO_DURATION_RE.captures(raw.trim().trim_matches('"'))?;
    let mut total: u64 = 0;
    let mut any = false;
    for (group, scale) in [(1, 3600), (2, 60), (3, 1)] {
        if let Some(m) = caps.get(group) {
            any = true;
            total = total.checked_add(m.as_str().parse::<u64>().ok()?.checked_mul(scale)?)?;
        }
    }
    any.then_some(total)
}

/// Pivots long-format samples into a wide series.
#[allow(clippy::cast_precision_loss)]
pub fn pivot(samples: impl IntoIterator<Item = RawSample>, options: &PivotOptions) -> Pivoted {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: BTreeMap<NaiveDateTime, HashMap<String, Value>> = BTreeMap::new();
    let mut dropped = 0;
    let mut out_of_window = 0;

    for sample in samples {
        let Some(at) = parse_log_timestamp(&sample.timestamp) else {
            tracing::debug!(timestamp = %sample.timestamp, "dropping sample with malformed timestamp");
            dropped += 1;
            continue;
        };
        if !options.in_window(at) {
            out_of_window += 1;
            continue;
        }

        if !columns.contains(&sample.name) {
            columns.push(sample.name.clone());
        }
        let value = if options.duration_channels.contains(&sample.name) {
            let seconds = parse_iso_duration(&sample.data);
            if seconds.is_none() {
                tracing::debug!(
                    channel = %sample.name,
                    data = %sample.data,
                    "invalid duration value"
                );
            }
            seconds.map(|s| Value::Number(s as f64))
        } else {
            Value::parse(&sample.data)
        };

        let row = rows.entry(at).or_default();
        match value {
            Some(v) => row.insert(sample.name, v),
            None => row.remove(&sample.name),
        };
    }

    let records: Vec<Record> = rows
        .into_iter()
        .map(|(timestamp, values)| Record { timestamp, values })
        .collect();

    tracing::info!(
        rows = records.len(),
        channels = columns.len(),
        dropped,
        out_of_window,
        "pivoted controller log"
    );

    Pivoted {
        series: Series { columns, records },
        dropped,
        out_of_window,
    }
}

/// The standard split of controller channels into tables.
pub fn default_tables() -> BTreeMap<String, Vec<String>> {
    let table = |columns: &[&str]| columns.iter().map(ToString::to_string).collect();
    BTreeMap::from([
        (
            "temps".to_string(),
            table(&[
                "DROPS_SCORE",
                "SET_BURNERS_TEMP",
                "ACTUAL_BURNERS_TEMP",
                "TOP_TEMP",
                "MID_TEMP",
                "BOTTOM_TEMP",
            ]),
        ),
        (
            "moistures".to_string(),
            table(&[
                "GRAIN_TYPE",
                "DROPS_SCORE",
                "DRY_MOISTURE",
                "DRY_TEMP",
                "DRY_NATURE",
                "WET_MOISTURE",
                "WET_TEMP",
                "WET_NATURE",
            ]),
        ),
        (
            "moistures_temps".to_string(),
            table(&[
                "GRAIN_TYPE",
                "DROPS_SCORE",
                "ACTUAL_BURNERS_TEMP",
                "TOP_TEMP",
                "MID_TEMP",
                "BOTTOM_TEMP",
                "DRY_MOISTURE",
                "DRY_TEMP",
                "DRY_NATURE",
                "WET_MOISTURE",
                "WET_TEMP",
                "WET_NATURE",
            ]),
        ),
        (
            "settings".to_string(),
            table(&[
                "DROPS_SCORE",
                "DROPS_SET_TIMER",
                "SET_BURNERS_TEMP",
                "COOLING_TIME",
                "BOTTOM_TEMP_LIMIT",
                "UPPER_FAN_SET_HZ",
                "LOWER_FAN_SET_HZ",
                "MID_TEMP_LIMIT",
            ]),
        ),
        (
            "mode".to_string(),
            table(&[
                "DROPS_SCORE",
                "FILLING",
                "DRYING",
                "RECYCLING",
                "EMPTY",
                "SHUTDOWN",
                "STOP",
                "COOLING",
                "MANUAL",
            ]),
        ),
        (
            "alarms".to_string(),
            table(&[
                "DROPS_SCORE",
                "MIDDLE_LEVEL_ALARM",
                "HIGH_LEVEL_ALARM",
                "BURNER_HIGH_ALARM",
                "HOPPER_FULL_ALARM",
                "LOW_AIR_PRESSURE_ALARM",
                "GENERAL_ALARM",
                "AIR_OVERHEATED",
            ]),
        ),
    ])
}
