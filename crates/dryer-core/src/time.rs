//! Time normalization.
//!
//! Dryer and lab tables carry the timestamp as two text cells, a
//! `DD-MM-YYYY` date and an `HH:MM:SS` time. Normalization parses the pair,
//! drops rows that cannot be parsed and sorts the rest ascending. Ties keep
//! their input order.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::types::CoreError;

/// Date format used at the file boundary.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Time-of-day format used at the file boundary.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A row that carries its timestamp as separate date and time text.
///
/// This trait lets normalization work with any row representation
/// (e.g., raw CSV rows, lab readings, or test fixtures).
pub trait Timestamped {
    /// Returns the date cell, if present.
    fn date_text(&self) -> Option<&str>;

    /// Returns the time cell, if present.
    fn time_text(&self) -> Option<&str>;
}

/// An unparsed table row: date/time text plus the remaining cells by column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow {
    pub date: Option<String>,
    pub time: Option<String>,
    pub fields: Vec<(String, String)>,
}

impl RawRow {
    /// Returns the raw cell for `column`, if present.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

impl Timestamped for RawRow {
    fn date_text(&self) -> Option<&str> {
        self.date.as_deref()
    }

    fn time_text(&self) -> Option<&str> {
        self.time.as_deref()
    }
}

/// Result of normalizing a batch of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    /// Parsed rows, sorted ascending by timestamp.
    pub rows: Vec<(NaiveDateTime, T)>,
    /// Number of rows dropped because their timestamp did not parse.
    pub dropped: usize,
}

/// Parses a `DD-MM-YYYY` date and `HH:MM:SS` time into one timestamp.
///
/// Fractional seconds are not accepted; the boundary format is whole seconds.
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
    let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT).ok()?;
    Some(date.and_time(time))
}

/// Formats the date half of a timestamp for output.
pub fn format_date(timestamp: NaiveDateTime) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

/// Formats the time half of a timestamp for output.
pub fn format_time(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIME_FORMAT).to_string()
}

/// Formats a timestamp as `DD-MM-YYYY HH:MM:SS`.
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp
        .format(&format!("{DATE_FORMAT} {TIME_FORMAT}"))
        .to_string()
}

/// Clock correction of `seconds` seconds.
pub fn seconds_offset(seconds: i64) -> Result<Duration, CoreError> {
    Duration::try_seconds(seconds).ok_or(CoreError::OffsetOutOfRange {
        value: seconds,
        unit: "seconds",
    })
}

/// Clock correction of `minutes` minutes.
pub fn minutes_offset(minutes: i64) -> Result<Duration, CoreError> {
    Duration::try_minutes(minutes).ok_or(CoreError::OffsetOutOfRange {
        value: minutes,
        unit: "minutes",
    })
}

/// Truncates a timestamp to the start of its minute.
pub fn truncate_to_minute(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(timestamp)
}

/// Parses and sorts rows, dropping those with malformed or missing timestamps.
///
/// The sort is stable, so rows with equal timestamps keep their input order.
/// Positions in the returned vector are the new contiguous row indices.
pub fn normalize<T: Timestamped>(rows: Vec<T>) -> Normalized<T> {
    let total = rows.len();
    let mut parsed: Vec<(NaiveDateTime, T)> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let stamp = row
                .date_text()
                .zip(row.time_text())
                .and_then(|(date, time)| parse_timestamp(date, time));
            if stamp.is_none() {
                tracing::debug!(
                    row = idx,
                    date = row.date_text().unwrap_or(""),
                    time = row.time_text().unwrap_or(""),
                    "dropping row with malformed timestamp"
                );
            }
            stamp.map(|ts| (ts, row))
        })
        .collect();
    parsed.sort_by_key(|(ts, _)| *ts);

    let dropped = total - parsed.len();
    if dropped > 0 {
        tracing::info!(dropped, kept = parsed.len(), "dropped rows with malformed timestamps");
    }

    Normalized {
        rows: parsed,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, time: &str, tag: &str) -> RawRow {
        RawRow {
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            fields: vec![("tag".to_string(), tag.to_string())],
        }
    }

    #[test]
    fn parse_timestamp_accepts_boundary_format() {
        let ts = parse_timestamp("07-08-2024", "22:54:11").unwrap();
        assert_eq!(format_date(ts), "07-08-2024");
        assert_eq!(format_time(ts), "22:54:11");
        assert_eq!(format_timestamp(ts), "07-08-2024 22:54:11");
    }

    #[test]
    fn parse_timestamp_rejects_malformed_input() {
        assert!(parse_timestamp("2024-08-07", "22:54:11").is_none());
        assert!(parse_timestamp("32-08-2024", "22:54:11").is_none());
        assert!(parse_timestamp("07-08-2024", "25:00:00").is_none());
        assert!(parse_timestamp("07-08-2024", "").is_none());
    }

    #[test]
    fn offsets_reject_unrepresentable_values() {
        assert_eq!(seconds_offset(-10_667), Ok(Duration::seconds(-10_667)));
        assert_eq!(minutes_offset(180), Ok(Duration::hours(3)));
        assert_eq!(
            seconds_offset(i64::MAX),
            Err(CoreError::OffsetOutOfRange {
                value: i64::MAX,
                unit: "seconds"
            })
        );
        assert!(minutes_offset(i64::MIN).is_err());
    }

    #[test]
    fn truncate_to_minute_zeroes_seconds() {
        let ts = parse_timestamp("07-08-2024", "22:54:11").unwrap();
        assert_eq!(format_time(truncate_to_minute(ts)), "22:54:00");
    }

    #[test]
    fn normalize_drops_bad_rows_and_sorts() {
        let rows = vec![
            row("10-08-2024", "12:05:00", "c"),
            row("bad", "12:00:00", "x"),
            row("10-08-2024", "12:01:00", "a"),
            RawRow {
                date: None,
                time: Some("12:00:00".into()),
                fields: Vec::new(),
            },
            row("10-08-2024", "12:03:00", "b"),
        ];

        let normalized = normalize(rows);
        assert_eq!(normalized.dropped, 2);
        let tags: Vec<_> = normalized
            .rows
            .iter()
            .map(|(_, r)| r.field("tag").unwrap())
            .collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn normalize_is_stable_on_ties() {
        let rows = vec![
            row("10-08-2024", "12:01:00", "first"),
            row("10-08-2024", "12:00:00", "early"),
            row("10-08-2024", "12:01:00", "second"),
        ];

        let normalized = normalize(rows);
        let tags: Vec<_> = normalized
            .rows
            .iter()
            .map(|(_, r)| r.field("tag").unwrap())
            .collect();
        assert_eq!(tags, vec!["early", "first", "second"]);
        assert_eq!(normalized.dropped, 0);
    }
}
