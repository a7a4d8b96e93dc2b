//! CSV readers.

use std::fs::File;
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use dryer_core::{EventReading, RawRow, RawSample, Series, normalize};

use crate::{Loaded, TableError, open_file};

/// Accepted header names for each event field, in preference order.
const GRAIN_COLUMNS: &[&str] = &["Grain"];
const MOISTURE_COLUMNS: &[&str] = &["Moisture", "%mois"];
const NATURE_COLUMNS: &[&str] = &["Nature", "TW"];
const TEMPERATURE_COLUMNS: &[&str] = &["Temperature", "Temp"];

fn reader(path: &Path) -> Result<csv::Reader<File>, TableError> {
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(open_file(path)?))
}

fn headers(reader: &mut csv::Reader<File>, path: &Path) -> Result<Vec<String>, TableError> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(TableError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(headers)
}

fn require(headers: &[String], column: &str, path: &Path) -> Result<(), TableError> {
    if headers.iter().any(|h| h == column) {
        Ok(())
    } else {
        Err(TableError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
    }
}

/// Picks the first of `aliases` present in `headers`.
fn resolve<'a>(headers: &[String], aliases: &[&'a str]) -> Option<&'a str> {
    aliases
        .iter()
        .find(|alias| headers.iter().any(|h| h == *alias))
        .copied()
}

/// Reads a `Date`/`Time` table without interpreting the cells.
///
/// Returns the channel columns (every header except `Date` and `Time`) and
/// one raw row per record.
pub fn read_raw_rows(path: &Path) -> Result<(Vec<String>, Vec<RawRow>), TableError> {
    let mut reader = reader(path)?;
    let headers = headers(&mut reader, path)?;
    require(&headers, "Date", path)?;
    require(&headers, "Time", path)?;

    let channels: Vec<String> = headers
        .iter()
        .filter(|h| !h.is_empty() && *h != "Date" && *h != "Time")
        .cloned()
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::default();
        for (name, cell) in headers.iter().zip(record.iter()) {
            match name.as_str() {
                "Date" => row.date = Some(cell.to_string()),
                "Time" => row.time = Some(cell.to_string()),
                "" => {}
                _ => row.fields.push((name.clone(), cell.to_string())),
            }
        }
        rows.push(row);
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), columns = channels.len(), "read table");
    Ok((channels, rows))
}

/// Loads a sensor table as a normalized series.
pub fn load_series(path: &Path) -> Result<Loaded<Series>, TableError> {
    let (columns, rows) = read_raw_rows(path)?;
    let normalized = normalize(rows);
    let dropped = normalized.dropped;
    Ok(Loaded {
        value: Series::from_normalized(columns, normalized),
        dropped,
    })
}

/// Builds a reading from a normalized row.
///
/// Unparseable numbers become missing values.
pub(crate) fn event_from_row(
    timestamp: NaiveDateTime,
    row: &RawRow,
    columns: &EventColumns,
) -> EventReading {
    let number = |column: Option<&str>| {
        column
            .and_then(|c| row.field(c))
            .and_then(|cell| cell.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite())
    };
    EventReading {
        timestamp,
        grain: row
            .field(columns.grain)
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(ToString::to_string),
        moisture: number(Some(columns.moisture)),
        nature: number(columns.nature),
        temperature: number(columns.temperature),
    }
}

/// Header names of the event fields in one table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventColumns {
    pub grain: &'static str,
    pub moisture: &'static str,
    pub nature: Option<&'static str>,
    pub temperature: Option<&'static str>,
}

impl EventColumns {
    /// Column names written by the Perten import.
    pub const CANONICAL: Self = Self {
        grain: "Grain",
        moisture: "Moisture",
        nature: Some("Nature"),
        temperature: Some("Temperature"),
    };

    fn resolve(headers: &[String], path: &Path) -> Result<Self, TableError> {
        let missing = |column: &str| TableError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        };
        Ok(Self {
            grain: resolve(headers, GRAIN_COLUMNS).ok_or_else(|| missing("Grain"))?,
            moisture: resolve(headers, MOISTURE_COLUMNS).ok_or_else(|| missing("Moisture"))?,
            nature: resolve(headers, NATURE_COLUMNS),
            temperature: resolve(headers, TEMPERATURE_COLUMNS),
        })
    }
}

/// Applies a clock correction, or `None` if the result leaves the calendar.
pub(crate) fn shifted(timestamp: NaiveDateTime, offset: Duration) -> Option<NaiveDateTime> {
    let shifted = timestamp.checked_add_signed(offset);
    if shifted.is_none() {
        tracing::debug!(%timestamp, ?offset, "clock correction out of range, dropping reading");
    }
    shifted
}

/// Loads lab readings from an event table, shifting each by `offset`.
///
/// Readings the offset would push out of the calendar count as dropped.
///
/// `Moisture`, `Nature` and `Temperature` may also be headed `%mois`, `TW`
/// and `Temp`. `Grain` and a moisture column are required.
pub fn load_events(path: &Path, offset: Duration) -> Result<Loaded<Vec<EventReading>>, TableError> {
    let (channels, rows) = read_raw_rows(path)?;
    let columns = EventColumns::resolve(&channels, path)?;

    let normalized = normalize(rows);
    let readings: Vec<EventReading> = normalized
        .rows
        .iter()
        .filter_map(|(timestamp, row)| {
            shifted(*timestamp, offset).map(|at| event_from_row(at, row, &columns))
        })
        .collect();

    let dropped = normalized.dropped + (normalized.rows.len() - readings.len());
    tracing::info!(
        path = %path.display(),
        readings = readings.len(),
        dropped,
        "loaded lab readings"
    );
    Ok(Loaded {
        value: readings,
        dropped,
    })
}

/// Reads the long-format controller log.
///
/// Requires `timestamp`, `var_name` and `var_data` columns; any others
/// (such as `measured`) are ignored.
pub fn read_raw_log(path: &Path) -> Result<Vec<RawSample>, TableError> {
    let mut reader = reader(path)?;
    let headers = headers(&mut reader, path)?;
    let position = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| TableError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            })
    };
    let timestamp = position("timestamp")?;
    let name = position("var_name")?;
    let data = position("var_data")?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        samples.push(RawSample {
            timestamp: cell(timestamp),
            name: cell(name),
            data: cell(data),
        });
    }

    tracing::debug!(path = %path.display(), samples = samples.len(), "read controller log");
    Ok(samples)
}
