//! CSV writers.
//!
//! Writers take any [`std::io::Write`]; pair them with
//! [`create_file`](crate::create_file) to write to disk. Empty cells are
//! written as empty strings.

use std::io::Write;

use dryer_core::enrich::GRAIN_TYPE_COLUMN;
use dryer_core::time::{format_date, format_time, format_timestamp};
use dryer_core::{AlarmSegment, EventReading, GrainClass, ReconciledSeries, Series, Value};
use serde::Serialize;

use crate::TableError;

fn number(value: Option<f64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}

fn cell(value: Option<&Value>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// Writes a series as `Date, Time, <columns>`.
pub fn write_series<W: Write>(writer: W, series: &Series) -> Result<(), TableError> {
    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec!["Date", "Time"];
    header.extend(series.columns.iter().map(String::as_str));
    out.write_record(&header)?;

    for record in &series.records {
        let mut row = vec![format_date(record.timestamp), format_time(record.timestamp)];
        row.extend(series.columns.iter().map(|c| cell(record.get(c))));
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes lab readings as `Date, Time, Grain, Moisture, Nature, Temperature`.
///
/// When `status` is given, a `Grain_Status` column is appended; it must
/// hold one entry per reading.
pub fn write_events<W: Write>(
    writer: W,
    events: &[EventReading],
    status: Option<&[GrainClass]>,
) -> Result<(), TableError> {
    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec!["Date", "Time", "Grain", "Moisture", "Nature", "Temperature"];
    if status.is_some() {
        header.push("Grain_Status");
    }
    out.write_record(&header)?;

    for (idx, event) in events.iter().enumerate() {
        let mut row = vec![
            format_date(event.timestamp),
            format_time(event.timestamp),
            event.grain.clone().unwrap_or_default(),
            number(event.moisture),
            number(event.nature),
            number(event.temperature),
        ];
        if let Some(status) = status {
            row.push(status.get(idx).map(ToString::to_string).unwrap_or_default());
        }
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the reconciled series.
///
/// Columns: `Date, Time, GRAIN_TYPE`, the base channels, then
/// `<group>_Grain, <group>_Moisture, <group>_Nature, <group>_Temperature`
/// for every destination group, `provenance`, and `dry_mass` and `mode`
/// when they were derived.
pub fn write_reconciled<W: Write>(writer: W, series: &ReconciledSeries) -> Result<(), TableError> {
    let base_columns: Vec<&String> = series
        .base
        .columns
        .iter()
        .filter(|c| *c != GRAIN_TYPE_COLUMN)
        .collect();
    let groups = &series.reconciliation.groups;

    let mut header: Vec<String> = vec!["Date".into(), "Time".into(), GRAIN_TYPE_COLUMN.into()];
    header.extend(base_columns.iter().map(|c| (*c).clone()));
    for group in groups {
        for field in ["Grain", "Moisture", "Nature", "Temperature"] {
            header.push(format!("{}_{field}", group.name));
        }
    }
    header.push("provenance".into());
    if series.dry_mass.is_some() {
        header.push("dry_mass".into());
    }
    if series.mode.is_some() {
        header.push("mode".into());
    }

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&header)?;
    for (idx, record) in series.base.records.iter().enumerate() {
        let mut row = vec![
            format_date(record.timestamp),
            format_time(record.timestamp),
            series.grain_type[idx].clone().unwrap_or_default(),
        ];
        row.extend(base_columns.iter().map(|c| cell(record.get(c))));
        for group in groups {
            row.push(group.grain[idx].clone().unwrap_or_default());
            row.push(number(group.moisture[idx]));
            row.push(number(group.nature[idx]));
            row.push(number(group.temperature[idx]));
        }
        row.push(
            series.provenance[idx]
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
        );
        if let Some(masses) = &series.dry_mass {
            row.push(masses[idx].to_string());
        }
        if let Some(modes) = &series.mode {
            row.push(modes[idx].clone().unwrap_or_default());
        }
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct SegmentRow<'a> {
    #[serde(rename = "Alarm_Type")]
    alarm_type: &'a str,
    #[serde(rename = "Start")]
    start: String,
    #[serde(rename = "End")]
    end: String,
    #[serde(rename = "Duration_minutes")]
    duration_minutes: f64,
    #[serde(rename = "Open_Ended")]
    open_ended: bool,
}

/// Writes the segment table.
///
/// Start and end are written as `DD-MM-YYYY HH:MM:SS`.
pub fn write_segments<W: Write>(writer: W, segments: &[AlarmSegment]) -> Result<(), TableError> {
    let mut out = csv::Writer::from_writer(writer);
    if segments.is_empty() {
        out.write_record(["Alarm_Type", "Start", "End", "Duration_minutes", "Open_Ended"])?;
    }
    for segment in segments {
        out.serialize(SegmentRow {
            alarm_type: &segment.channel,
            start: format_timestamp(segment.start),
            end: format_timestamp(segment.end),
            duration_minutes: segment.duration_minutes,
            open_ended: segment.is_open_ended,
        })?;
    }
    out.flush()?;
    Ok(())
}
