//! Core type definitions shared by every processing stage.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::time::{Normalized, RawRow};

/// Structural errors raised by the processing stages.
///
/// Per-row data problems never show up here; they are counted and skipped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A sequence the stage cannot work without was empty.
    #[error("{what} is empty")]
    EmptySeries { what: &'static str },

    /// The destination-group schema has no groups.
    #[error("destination-group schema must contain at least one group")]
    EmptySchema,

    /// Two destination groups share a name.
    #[error("duplicate destination group: {name}")]
    DuplicateGroup { name: String },

    /// A classification label is routed to more than one group.
    #[error("classification {label} is routed to both {first} and {second}")]
    AmbiguousRoute {
        label: String,
        first: String,
        second: String,
    },

    /// Classification thresholds are not ordered or not finite.
    #[error("invalid thresholds for {grain}: dry_from {dry_from} must not exceed wet_above {wet_above}")]
    InvalidThresholds {
        grain: String,
        dry_from: f64,
        wet_above: f64,
    },

    /// A channel required by the stage is not a column of the series.
    #[error("channel {channel} is not present in the series")]
    MissingChannel { channel: String },

    /// A clock correction cannot be represented or moves a timestamp out of range.
    #[error("clock offset of {value} {unit} is out of range")]
    OffsetOutOfRange { value: i64, unit: &'static str },
}

/// A single cell value from a sensor or lab table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Parses a raw cell. Empty cells (and `nan`) yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_matches('"');
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return None;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Some(Self::Bool(true));
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Some(Self::Bool(false));
        }
        trimmed.parse::<f64>().map_or_else(
            |_| Some(Self::Text(trimmed.to_string())),
            |n| Some(Self::Number(n)),
        )
    }

    /// Numeric view of the value. Booleans count as 1/0.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(_) => None,
        }
    }

    /// Whether the value reads as an active flag (`true` or a non-zero number).
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => s.eq_ignore_ascii_case("true") || s == "1",
        }
    }

    /// Text view of the value, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Rounds `value` to `decimals` places.
#[allow(clippy::cast_possible_wrap)]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10_f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// One timestamped row of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// When the row was sampled.
    pub timestamp: NaiveDateTime,
    /// Channel name to value. Absent channels are empty cells.
    pub values: HashMap<String, Value>,
}

impl Record {
    /// Creates an empty row at `timestamp`.
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            values: HashMap::new(),
        }
    }

    /// Returns the value of `channel`, if present.
    pub fn get(&self, channel: &str) -> Option<&Value> {
        self.values.get(channel)
    }

    /// Returns the numeric value of `channel`, if present and numeric.
    pub fn number(&self, channel: &str) -> Option<f64> {
        self.get(channel).and_then(Value::as_f64)
    }
}

/// An ordered sequence of rows sharing one column layout.
///
/// After normalization the rows are sorted ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    /// Channel columns in output order, excluding `Date` and `Time`.
    pub columns: Vec<String>,
    /// Rows in chronological order.
    pub records: Vec<Record>,
}

impl Series {
    /// Creates an empty series with the given columns.
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds a series from normalized raw rows, parsing every cell.
    pub fn from_normalized(columns: Vec<String>, normalized: Normalized<RawRow>) -> Self {
        let records = normalized
            .rows
            .into_iter()
            .map(|(timestamp, row)| Record {
                timestamp,
                values: row
                    .fields
                    .into_iter()
                    .filter_map(|(name, raw)| Value::parse(&raw).map(|v| (name, v)))
                    .collect(),
            })
            .collect();
        Self { columns, records }
    }

    /// Whether `channel` is one of the series' columns.
    pub fn has_column(&self, channel: &str) -> bool {
        self.columns.iter().any(|c| c == channel)
    }

    /// Timestamps of every row, in row order.
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.records.iter().map(|r| r.timestamp).collect()
    }

    /// Numeric values of `channel`, one entry per row.
    pub fn numeric_column(&self, channel: &str) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.number(channel)).collect()
    }

    /// Projects the series onto the listed columns that it actually has.
    ///
    /// Rows are kept even when every selected cell is empty.
    pub fn select(&self, columns: &[String]) -> Self {
        let kept: Vec<String> = columns
            .iter()
            .filter(|c| self.has_column(c))
            .cloned()
            .collect();
        let records = self
            .records
            .iter()
            .map(|r| Record {
                timestamp: r.timestamp,
                values: kept
                    .iter()
                    .filter_map(|c| r.values.get(c).map(|v| (c.clone(), v.clone())))
                    .collect(),
            })
            .collect();
        Self {
            columns: kept,
            records,
        }
    }
}
