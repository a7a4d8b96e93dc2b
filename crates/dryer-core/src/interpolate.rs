//! Gap filling for reconciled lab columns.
//!
//! After reconciliation most base rows have no lab reading. The numeric
//! group columns are filled by linear interpolation over row positions;
//! gaps before the first or after the last known value take the nearest
//! known value. Rows are tagged with where their values came from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reconcile::Reconciliation;
use crate::types::round_to;

/// Decimal places kept for filled lab values.
pub const FILL_DECIMALS: u32 = 3;

/// Where a row's lab values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// A reading was assigned to the row directly.
    Real,
    /// The row's values were interpolated from neighbours.
    Calculated,
}

impl Provenance {
    /// String representation for tables.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Calculated => "calculated",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fills the `None` entries of `values` in place.
///
/// Interior gaps are interpolated linearly by position between the nearest
/// known neighbours; leading and trailing gaps copy the nearest known value.
/// A column with no known value is left untouched. Returns the positions
/// that were filled.
#[allow(clippy::cast_precision_loss)]
pub fn interpolate_linear(values: &mut [Option<f64>]) -> Vec<usize> {
    let known: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect();
    let (Some(&(first_idx, first)), Some(&(last_idx, last))) = (known.first(), known.last()) else {
        return Vec::new();
    };

    let mut filled = Vec::new();
    for idx in 0..first_idx {
        values[idx] = Some(first);
        filled.push(idx);
    }
    for pair in known.windows(2) {
        let (lo_idx, lo) = pair[0];
        let (hi_idx, hi) = pair[1];
        let span = (hi_idx - lo_idx) as f64;
        for idx in lo_idx + 1..hi_idx {
            let offset = (idx - lo_idx) as f64;
            values[idx] = Some(lo + (hi - lo) * offset / span);
            filled.push(idx);
        }
    }
    for idx in last_idx + 1..values.len() {
        values[idx] = Some(last);
        filled.push(idx);
    }
    filled
}

/// Interpolates every numeric group column and tags row provenance.
///
/// All numeric values are rounded to [`FILL_DECIMALS`] places. A row is
/// `real` when it received a reading directly, `calculated` when it only
/// holds interpolated values, and untagged when it holds nothing.
pub fn fill_gaps(reconciliation: &mut Reconciliation) -> Vec<Option<Provenance>> {
    let rows = reconciliation.rows();
    let mut touched = vec![false; rows];

    for group in &mut reconciliation.groups {
        for column in group.numeric_mut() {
            for idx in interpolate_linear(column) {
                touched[idx] = true;
            }
            for value in column.iter_mut().flatten() {
                *value = round_to(*value, FILL_DECIMALS);
            }
        }
    }

    let provenance: Vec<Option<Provenance>> = reconciliation
        .direct
        .iter()
        .zip(&touched)
        .map(|(&direct, &touched)| {
            if direct {
                Some(Provenance::Real)
            } else if touched {
                Some(Provenance::Calculated)
            } else {
                None
            }
        })
        .collect();

    tracing::debug!(
        rows,
        calculated = provenance
            .iter()
            .filter(|p| **p == Some(Provenance::Calculated))
            .count(),
        "filled reconciliation gaps"
    );
    provenance
}
