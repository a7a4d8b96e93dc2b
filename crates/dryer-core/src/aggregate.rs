//! Minute aggregation.
//!
//! The controller logs several samples per minute. Aggregation collapses
//! every minute bucket into a single row, reducing each channel with the
//! policy configured for it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::time::truncate_to_minute;
use crate::types::{Record, Series, Value, round_to};

/// How the samples of one channel within a minute are reduced to one value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum Reduction {
    /// First sample in the minute that has a value.
    #[default]
    FirstNonEmpty,
    /// Last sample in the minute that has a value (settled state flags).
    LastNonEmpty,
    /// `true` if any sample in the minute is active (alarm flags).
    LogicalOr,
    /// First numeric sample multiplied by `factor`, rounded to `decimals`.
    ScaleAndRound { factor: f64, decimals: u32 },
}

impl Reduction {
    fn reduce<'a>(&self, samples: impl DoubleEndedIterator<Item = Option<&'a Value>>) -> Option<Value> {
        match self {
            Self::FirstNonEmpty => samples.flatten().next().cloned(),
            Self::LastNonEmpty => samples.rev().flatten().next().cloned(),
            Self::LogicalOr => Some(Value::Bool(samples.flatten().any(Value::is_truthy))),
            Self::ScaleAndRound { factor, decimals } => samples
                .flatten()
                .find_map(Value::as_f64)
                .map(|n| Value::Number(round_to(n * factor, *decimals))),
        }
    }
}

/// Per-channel reduction policies for one kind of table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AggregationProfile {
    /// Policy for channels without an explicit entry.
    #[serde(default)]
    pub default: Reduction,
    /// Channel name to policy.
    #[serde(default)]
    pub channels: BTreeMap<String, Reduction>,
}

impl AggregationProfile {
    /// Creates a profile that applies `policy` to every listed channel.
    pub fn with_channels<'a>(
        channels: impl IntoIterator<Item = &'a str>,
        policy: Reduction,
    ) -> Self {
        Self {
            default: Reduction::FirstNonEmpty,
            channels: channels
                .into_iter()
                .map(|name| (name.to_string(), policy))
                .collect(),
        }
    }

    /// Returns the policy for `channel`.
    pub fn policy_for(&self, channel: &str) -> Reduction {
        self.channels.get(channel).copied().unwrap_or(self.default)
    }
}

/// Collapses the series to exactly one row per distinct minute.
///
/// Output rows are stamped with the minute start (seconds forced to zero)
/// and keep the input column layout.
///
/// Re-aggregating the output is a no-op for every reduction except
/// `ScaleAndRound`, which scales again on each pass. Feed it raw tables only.
pub fn aggregate_by_minute(series: &Series, profile: &AggregationProfile) -> Series {
    let mut buckets: BTreeMap<_, Vec<&Record>> = BTreeMap::new();
    for record in &series.records {
        buckets
            .entry(truncate_to_minute(record.timestamp))
            .or_default()
            .push(record);
    }

    let records: Vec<Record> = buckets
        .into_iter()
        .map(|(minute, rows)| {
            let values: HashMap<String, Value> = series
                .columns
                .iter()
                .filter_map(|channel| {
                    profile
                        .policy_for(channel)
                        .reduce(rows.iter().map(|r| r.get(channel)))
                        .map(|v| (channel.clone(), v))
                })
                .collect();
            Record {
                timestamp: minute,
                values,
            }
        })
        .collect();

    tracing::debug!(
        input = series.len(),
        output = records.len(),
        "aggregated series by minute"
    );

    Series {
        columns: series.columns.clone(),
        records,
    }
}
