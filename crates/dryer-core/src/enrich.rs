//! Derived columns for the reconciled series.
//!
//! Once lab readings are merged and gaps filled, three more columns are
//! derived from the result:
//!
//! - `GRAIN_TYPE`: the grain of the most recent assigned reading, carried
//!   forward along the series.
//! - `dry_mass`: the batch mass estimate, emitted on rows where the drop
//!   counter advanced while the dried grain was within its target band.
//! - `mode`: the controller's operating mode, joined from the mode table
//!   on exact minute.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::classify::ClassificationRules;
use crate::interpolate::{Provenance, fill_gaps};
use crate::reconcile::Reconciliation;
use crate::types::{Record, Series, Value, round_to};

/// Name of the derived grain column. It replaces a base column of the same
/// name in the reconciled table.
pub const GRAIN_TYPE_COLUMN: &str = "GRAIN_TYPE";

/// Controller mode flags, in resolution order.
pub const MODE_FLAGS: [&str; 8] = [
    "FILLING",
    "DRYING",
    "RECYCLING",
    "EMPTY",
    "SHUTDOWN",
    "STOP",
    "COOLING",
    "MANUAL",
];

/// Parameters for the derived columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichOptions {
    /// Destination group whose moisture and nature feed `dry_mass`.
    pub mass_group: String,
    /// Base channel counting discharged drops.
    pub drops_column: String,
    /// Multiplier turning test weight into batch mass.
    pub mass_factor: f64,
    /// Mode flags in resolution order; the first active one wins.
    pub mode_flags: Vec<String>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            mass_group: "dry".to_string(),
            drops_column: "DROPS_SCORE".to_string(),
            mass_factor: 497.2,
            mode_flags: MODE_FLAGS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Grain of each row's first assigned group, carried forward.
///
/// Rows before the first assignment stay empty.
pub fn fill_grain_type(reconciliation: &Reconciliation) -> Vec<Option<String>> {
    let mut current: Option<String> = None;
    (0..reconciliation.rows())
        .map(|row| {
            if let Some(grain) = reconciliation
                .groups
                .iter()
                .find_map(|g| g.grain[row].as_ref())
            {
                current = Some(grain.clone());
            }
            current.clone()
        })
        .collect()
}

/// Batch mass per row.
///
/// Returns `None` when the base has no drop counter or the schema has no
/// mass group; the column is then omitted.
pub fn dry_mass(
    base: &Series,
    reconciliation: &Reconciliation,
    grain_type: &[Option<String>],
    rules: &ClassificationRules,
    options: &EnrichOptions,
) -> Option<Vec<f64>> {
    if !base.has_column(&options.drops_column) {
        tracing::warn!(
            column = %options.drops_column,
            "base series has no drop counter, skipping dry mass"
        );
        return None;
    }
    let Some(group) = reconciliation.group(&options.mass_group) else {
        tracing::warn!(group = %options.mass_group, "no such destination group, skipping dry mass");
        return None;
    };

    let drops = base.numeric_column(&options.drops_column);
    let masses = (0..base.len())
        .map(|row| {
            if row == 0 {
                return 0.0;
            }
            let advanced = match drops[row] {
                Some(current) => current != 0.0 && drops[row - 1] != Some(current),
                None => false,
            };
            let wet_above = rules
                .thresholds_for(grain_type.get(row).and_then(Option::as_deref))
                .wet_above;
            let in_band = group.moisture[row].is_some_and(|m| m > 0.0 && m <= wet_above);
            match group.nature[row] {
                Some(nature) if advanced && in_band && nature != 0.0 => {
                    round_to(nature * options.mass_factor, 3)
                }
                _ => 0.0,
            }
        })
        .collect();
    Some(masses)
}

/// Active mode of each base row, joined on exact timestamp.
///
/// Rows without a matching mode row, or with no active flag, stay empty.
pub fn resolve_modes(base: &Series, modes: &Series, flags: &[String]) -> Vec<Option<String>> {
    let mut by_time: HashMap<NaiveDateTime, &Record> = HashMap::new();
    for record in &modes.records {
        by_time.entry(record.timestamp).or_insert(record);
    }

    let resolved: Vec<Option<String>> = base
        .records
        .iter()
        .map(|row| {
            let record = by_time.get(&row.timestamp)?;
            flags
                .iter()
                .find(|flag| record.get(flag).is_some_and(Value::is_truthy))
                .cloned()
        })
        .collect();

    tracing::debug!(
        rows = resolved.len(),
        resolved = resolved.iter().filter(|m| m.is_some()).count(),
        "resolved operating modes"
    );
    resolved
}

/// A base series with merged lab readings and every derived column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledSeries {
    pub base: Series,
    pub reconciliation: Reconciliation,
    /// Per row: where the lab values came from.
    pub provenance: Vec<Option<Provenance>>,
    pub grain_type: Vec<Option<String>>,
    /// `None` when the inputs needed for mass estimation are missing.
    pub dry_mass: Option<Vec<f64>>,
    /// `None` when no mode table was supplied.
    pub mode: Option<Vec<Option<String>>>,
}

impl ReconciledSeries {
    /// Fills gaps in `reconciliation` and derives the extra columns.
    pub fn build(
        base: Series,
        mut reconciliation: Reconciliation,
        modes: Option<&Series>,
        rules: &ClassificationRules,
        options: &EnrichOptions,
    ) -> Self {
        let grain_type = fill_grain_type(&reconciliation);
        let provenance = fill_gaps(&mut reconciliation);
        let dry_mass = dry_mass(&base, &reconciliation, &grain_type, rules, options);
        let mode = modes.map(|m| resolve_modes(&base, m, &options.mode_flags));

        Self {
            base,
            reconciliation,
            provenance,
            grain_type,
            dry_mass,
            mode,
        }
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, NaiveDate};

    use crate::reconcile::{GroupColumns, MatchStats};

    fn ts(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 10)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn base(drops: &[Option<f64>]) -> Series {
        let records = drops
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let mut record = Record::new(ts(i64::try_from(i).unwrap()));
                if let Some(d) = d {
                    record.values.insert("DROPS_SCORE".into(), Value::Number(*d));
                }
                record
            })
            .collect();
        Series {
            columns: vec!["DROPS_SCORE".into()],
            records,
        }
    }

    fn columns(name: &str, rows: usize) -> GroupColumns {
        GroupColumns {
            name: name.to_string(),
            grain: vec![None; rows],
            moisture: vec![None; rows],
            nature: vec![None; rows],
            temperature: vec![None; rows],
        }
    }

    fn reconciliation(groups: Vec<GroupColumns>) -> Reconciliation {
        let rows = groups[0].moisture.len();
        Reconciliation {
            groups,
            direct: vec![false; rows],
            stats: MatchStats::default(),
        }
    }

    #[test]
    fn grain_type_carries_forward() {
        let mut dry = columns("dry", 5);
        let mut wet = columns("wet", 5);
        wet.grain[1] = Some("raps".into());
        dry.grain[3] = Some("wheat".into());
        wet.grain[3] = Some("corn".into());

        let filled = fill_grain_type(&reconciliation(vec![dry, wet]));
        assert_eq!(
            filled,
            vec![
                None,
                Some("raps".into()),
                Some("raps".into()),
                Some("wheat".into()),
                Some("wheat".into()),
            ]
        );
    }

    #[test]
    fn dry_mass_on_drop_changes_within_band() {
        let base = base(&[Some(1.0), Some(2.0), Some(2.0), Some(3.0), Some(0.0), Some(5.0)]);
        let mut dry = columns("dry", 6);
        dry.moisture = vec![Some(13.0); 6];
        dry.nature = vec![Some(70.0); 6];
        dry.moisture[5] = Some(15.0);
        let reconciliation = reconciliation(vec![dry]);
        let grain = vec![Some("wheat".to_string()); 6];

        let masses = dry_mass(
            &base,
            &reconciliation,
            &grain,
            &ClassificationRules::default(),
            &EnrichOptions::default(),
        )
        .unwrap();

        // Row 0 has no predecessor, row 2 did not advance, row 4 reset to
        // zero and row 5 is above the wheat band.
        assert_eq!(masses, vec![0.0, 34_804.0, 0.0, 34_804.0, 0.0, 0.0]);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded mass is an exact decimal")]
    fn dry_mass_uses_grain_thresholds() {
        let base = base(&[Some(1.0), Some(2.0)]);
        let mut dry = columns("dry", 2);
        dry.moisture = vec![Some(10.0); 2];
        dry.nature = vec![Some(65.5); 2];
        let reconciliation = reconciliation(vec![dry]);
        let rules = ClassificationRules::default();
        let options = EnrichOptions::default();

        let raps = vec![Some("raps".to_string()); 2];
        let masses = dry_mass(&base, &reconciliation, &raps, &rules, &options).unwrap();
        assert_eq!(masses, vec![0.0, 0.0]);

        let wheat = vec![Some("wheat".to_string()); 2];
        let masses = dry_mass(&base, &reconciliation, &wheat, &rules, &options).unwrap();
        assert_eq!(masses[1], 32_566.6);
    }

    #[test]
    fn dry_mass_needs_drop_counter() {
        let mut series = base(&[Some(1.0)]);
        series.columns.clear();
        let reconciliation = reconciliation(vec![columns("dry", 1)]);
        assert!(
            dry_mass(
                &series,
                &reconciliation,
                &[None],
                &ClassificationRules::default(),
                &EnrichOptions::default(),
            )
            .is_none()
        );
    }

    #[test]
    fn modes_join_on_exact_timestamp() {
        let base = base(&[None, None, None]);
        let mut modes = Series::new(vec!["DRYING".into(), "COOLING".into()]);
        let mut drying = Record::new(ts(0));
        drying.values.insert("DRYING".into(), Value::Bool(true));
        drying.values.insert("COOLING".into(), Value::Bool(true));
        let mut idle = Record::new(ts(1));
        idle.values.insert("DRYING".into(), Value::Bool(false));
        let mut cooling = Record::new(ts(2) + Duration::seconds(30));
        cooling.values.insert("COOLING".into(), Value::Bool(true));
        modes.records = vec![drying, idle, cooling];

        let resolved = resolve_modes(&base, &modes, &EnrichOptions::default().mode_flags);
        assert_eq!(resolved, vec![Some("DRYING".into()), None, None]);
    }

    #[test]
    fn build_combines_every_column() {
        let base = base(&[Some(1.0), Some(2.0), Some(3.0)]);
        let mut dry = columns("dry", 3);
        dry.grain[0] = Some("wheat".into());
        dry.moisture[0] = Some(13.0);
        dry.nature[0] = Some(70.0);
        dry.moisture[2] = Some(14.0);
        dry.nature[2] = Some(72.0);
        let mut reconciliation = reconciliation(vec![dry]);
        reconciliation.direct = vec![true, false, true];

        let series = ReconciledSeries::build(
            base,
            reconciliation,
            None,
            &ClassificationRules::default(),
            &EnrichOptions::default(),
        );

        assert_eq!(series.len(), 3);
        assert_eq!(
            series.provenance,
            vec![
                Some(Provenance::Real),
                Some(Provenance::Calculated),
                Some(Provenance::Real)
            ]
        );
        assert_eq!(series.grain_type, vec![Some("wheat".to_string()); 3]);
        assert_eq!(series.dry_mass, Some(vec![0.0, 35_301.2, 35_798.4]));
        assert!(series.mode.is_none());
    }
}
