//! Alarm segmentation.
//!
//! Alarm channels are sampled as boolean flags. Segmentation turns each
//! channel into the list of intervals over which it held true.
//!
//! A segment opens on the first active sample and closes at the last
//! active sample before the channel goes inactive again. A channel still
//! active at the end of the series closes at the last timestamp and is
//! marked open-ended.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::{CoreError, Series};

/// A maximal interval over which an alarm channel held true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSegment {
    /// Alarm channel name.
    pub channel: String,
    /// First active sample.
    pub start: NaiveDateTime,
    /// Last active sample.
    pub end: NaiveDateTime,
    /// `end - start` in minutes.
    pub duration_minutes: f64,
    /// The channel was still active when the series ended.
    pub is_open_ended: bool,
}

impl AlarmSegment {
    #[allow(clippy::cast_precision_loss)]
    fn new(channel: &str, start: NaiveDateTime, end: NaiveDateTime, is_open_ended: bool) -> Self {
        Self {
            channel: channel.to_string(),
            start,
            end,
            duration_minutes: (end - start).num_milliseconds() as f64 / 60_000.0,
            is_open_ended,
        }
    }

    /// Moves the segment by `offset` (clock correction at the output boundary).
    ///
    /// Leaves the segment untouched if either end would leave the
    /// representable range.
    pub fn shift(&mut self, offset: Duration) -> Result<(), CoreError> {
        let out_of_range = || CoreError::OffsetOutOfRange {
            value: offset.num_seconds(),
            unit: "seconds",
        };
        let start = self.start.checked_add_signed(offset).ok_or_else(out_of_range)?;
        let end = self.end.checked_add_signed(offset).ok_or_else(out_of_range)?;
        self.start = start;
        self.end = end;
        Ok(())
    }
}

/// Segmentation state of one channel.
#[derive(Debug, Clone, Copy)]
enum ChannelState {
    Inactive,
    Active {
        start: NaiveDateTime,
        last_active: NaiveDateTime,
    },
}

/// Extracts the active segments of one channel.
///
/// `samples` must be in chronological order.
pub fn segment_channel(
    channel: &str,
    samples: impl IntoIterator<Item = (NaiveDateTime, bool)>,
) -> Vec<AlarmSegment> {
    let mut segments = Vec::new();
    let mut state = ChannelState::Inactive;
    let mut last_seen: Option<NaiveDateTime> = None;

    for (at, active) in samples {
        state = match (state, active) {
            (ChannelState::Inactive, true) => ChannelState::Active {
                start: at,
                last_active: at,
            },
            (ChannelState::Active { start, .. }, true) => ChannelState::Active {
                start,
                last_active: at,
            },
            (ChannelState::Active { start, last_active }, false) => {
                segments.push(AlarmSegment::new(channel, start, last_active, false));
                ChannelState::Inactive
            }
            (ChannelState::Inactive, false) => ChannelState::Inactive,
        };
        last_seen = Some(at);
    }

    if let (ChannelState::Active { start, .. }, Some(end)) = (state, last_seen) {
        segments.push(AlarmSegment::new(channel, start, end, true));
    }
    segments
}

/// Segments every listed channel of `series`.
///
/// Empty cells count as inactive. Segments are grouped by channel, in the
/// order the channels are listed.
pub fn segment_series(series: &Series, channels: &[String]) -> Result<Vec<AlarmSegment>, CoreError> {
    if let Some(missing) = channels.iter().find(|c| !series.has_column(c)) {
        return Err(CoreError::MissingChannel {
            channel: missing.clone(),
        });
    }

    let segments: Vec<AlarmSegment> = channels
        .iter()
        .flat_map(|channel| {
            segment_channel(
                channel,
                series.records.iter().map(|r| {
                    (
                        r.timestamp,
                        r.get(channel).is_some_and(crate::types::Value::is_truthy),
                    )
                }),
            )
        })
        .collect();

    tracing::info!(
        channels = channels.len(),
        segments = segments.len(),
        open_ended = segments.iter().filter(|s| s.is_open_ended).count(),
        "segmented alarm channels"
    );
    Ok(segments)
}
