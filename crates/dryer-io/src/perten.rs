//! Perten instrument log reader.
//!
//! The moisture analyser writes one whitespace-separated line per sample:
//!
//! ```text
//! 10-08-2024 12:00:00 raps N/A 8.1 65.2 21.4 ...
//! ```
//!
//! Fields are date, time, grain, sample id, moisture, test weight and
//! temperature; anything after the seventh field is ignored.

use std::io::{BufRead, BufReader};
use std::path::Path;

use dryer_core::{EventReading, RawRow, normalize, round_to, seconds_offset};
use serde::{Deserialize, Serialize};

use crate::read::{EventColumns, event_from_row, shifted};
use crate::{Loaded, TableError, open_file};

/// Fields a log line needs to be usable.
const MIN_FIELDS: usize = 7;

/// Decimal places kept for scaled test weights.
const NATURE_DECIMALS: u32 = 4;

/// Import parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PertenOptions {
    /// Clock correction added to every timestamp.
    #[serde(default)]
    pub offset_seconds: i64,
    /// Multiplier applied to the test weight.
    #[serde(default = "default_nature_scale")]
    pub nature_scale: f64,
}

const fn default_nature_scale() -> f64 {
    1.0
}

impl Default for PertenOptions {
    fn default() -> Self {
        Self {
            offset_seconds: 0,
            nature_scale: default_nature_scale(),
        }
    }
}

/// Reads the log into raw rows keyed by the event column names.
///
/// Returns the rows and the number of non-blank lines skipped for having
/// too few fields.
pub fn read_perten_log(path: &Path) -> Result<(Vec<RawRow>, usize), TableError> {
    let reader = BufReader::new(open_file(path)?);
    let mut rows = Vec::new();
    let mut skipped = 0;

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < MIN_FIELDS {
            tracing::debug!(line = number + 1, fields = fields.len(), "skipping short log line");
            skipped += 1;
            continue;
        }
        rows.push(RawRow {
            date: Some(fields[0].to_string()),
            time: Some(fields[1].to_string()),
            fields: [
                ("Grain", fields[2]),
                ("Moisture", fields[4]),
                ("Nature", fields[5]),
                ("Temperature", fields[6]),
            ]
            .map(|(name, cell)| (name.to_string(), cell.to_string()))
            .into(),
        });
    }
    Ok((rows, skipped))
}

/// Loads the log as lab readings, sorted and clock-corrected.
///
/// Short lines, lines with an unparseable timestamp and readings the offset
/// pushes out of the calendar all count as dropped. An offset that is not
/// a representable duration is an error.
pub fn load_perten(
    path: &Path,
    options: &PertenOptions,
) -> Result<Loaded<Vec<EventReading>>, TableError> {
    let (rows, skipped) = read_perten_log(path)?;
    let normalized = normalize(rows);
    let offset = seconds_offset(options.offset_seconds)?;

    #[allow(clippy::float_cmp)]
    let scale = (options.nature_scale != 1.0).then_some(options.nature_scale);
    let readings: Vec<EventReading> = normalized
        .rows
        .iter()
        .filter_map(|(timestamp, row)| {
            let at = shifted(*timestamp, offset)?;
            let mut reading = event_from_row(at, row, &EventColumns::CANONICAL);
            if let Some(scale) = scale {
                reading.nature = reading
                    .nature
                    .map(|n| round_to(n * scale, NATURE_DECIMALS));
            }
            Some(reading)
        })
        .collect();

    let dropped = skipped + normalized.dropped + (normalized.rows.len() - readings.len());
    tracing::info!(
        path = %path.display(),
        readings = readings.len(),
        dropped,
        "loaded perten log"
    );
    Ok(Loaded {
        value: readings,
        dropped,
    })
}
