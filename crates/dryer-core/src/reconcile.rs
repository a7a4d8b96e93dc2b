//! Nearest-match reconciliation of lab readings onto the sensor series.
//!
//! Perten lab readings are sparse and irregular; the dryer series is dense
//! and minute-aligned. Each reading is classified, routed to a destination
//! group (`dry_*` or `wet_*` columns by default) and written into the
//! closest base row whose slot for that group is still empty.
//!
//! # Algorithm Summary
//!
//! 1. Classify every reading and route it to a destination group
//! 2. Walk readings in chronological order
//! 3. Claim the nearest free row of the reading's group (ties go to the
//!    earliest row); once a group has no free row left, its remaining
//!    readings are dropped
//!
//! The default [`GreedyNearest`] strategy is local, not a globally optimal
//! assignment: an early reading can take the row a later reading would
//! have preferred. Other strategies plug in through [`MatchStrategy`].

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::classify::{ClassificationRules, GrainClass};
use crate::types::{CoreError, Series};

/// A lab measurement to merge into the base series.
#[derive(Debug, Clone, PartialEq)]
pub struct EventReading {
    /// When the sample was measured.
    pub timestamp: NaiveDateTime,
    /// Grain type label as written by the instrument.
    pub grain: Option<String>,
    /// Moisture percentage.
    pub moisture: Option<f64>,
    /// Test weight ("nature").
    pub nature: Option<f64>,
    /// Sample temperature.
    pub temperature: Option<f64>,
}

impl EventReading {
    /// Lowercased, trimmed grain label; empty when missing.
    fn grain_key(&self) -> String {
        self.grain
            .as_deref()
            .map(|g| g.trim().to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// A named set of output columns and the classifications routed into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationGroup {
    /// Column prefix, e.g. `dry` for `dry_Moisture`.
    pub name: String,
    /// Classifications that land in this group.
    pub accepts: Vec<GrainClass>,
}

impl DestinationGroup {
    pub fn new(name: impl Into<String>, accepts: impl Into<Vec<GrainClass>>) -> Self {
        Self {
            name: name.into(),
            accepts: accepts.into(),
        }
    }
}

/// A validated list of destination groups.
///
/// Group names are unique and each classification is routed to at most one
/// group. A classification routed nowhere leaves its readings unmatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DestinationGroup>", into = "Vec<DestinationGroup>")]
pub struct GroupSchema {
    groups: Vec<DestinationGroup>,
}

impl GroupSchema {
    /// Creates a schema after validation.
    pub fn new(groups: Vec<DestinationGroup>) -> Result<Self, CoreError> {
        if groups.is_empty() {
            return Err(CoreError::EmptySchema);
        }
        for (idx, group) in groups.iter().enumerate() {
            if groups[..idx].iter().any(|g| g.name == group.name) {
                return Err(CoreError::DuplicateGroup {
                    name: group.name.clone(),
                });
            }
            for class in &group.accepts {
                if let Some(other) = groups[..idx].iter().find(|g| g.accepts.contains(class)) {
                    return Err(CoreError::AmbiguousRoute {
                        label: class.to_string(),
                        first: other.name.clone(),
                        second: group.name.clone(),
                    });
                }
            }
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[DestinationGroup] {
        &self.groups
    }

    /// Index of the group that receives `class`, if any.
    pub fn route(&self, class: GrainClass) -> Option<usize> {
        self.groups.iter().position(|g| g.accepts.contains(&class))
    }

    /// Index of the group called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }
}

impl Default for GroupSchema {
    fn default() -> Self {
        Self {
            groups: vec![
                DestinationGroup::new("dry", [GrainClass::Dry, GrainClass::Overdry]),
                DestinationGroup::new("wet", [GrainClass::Wet]),
            ],
        }
    }
}

impl TryFrom<Vec<DestinationGroup>> for GroupSchema {
    type Error = CoreError;

    fn try_from(value: Vec<DestinationGroup>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GroupSchema> for Vec<DestinationGroup> {
    fn from(schema: GroupSchema) -> Self {
        schema.groups
    }
}

/// Consumption flags for one reconciliation pass.
///
/// Tracks, per destination group, which base rows already hold a reading,
/// and which readings have been retired. Flags only ever go from free to
/// claimed.
#[derive(Debug, Clone)]
pub struct MatchState {
    /// `[group][row]`: index of the reading that claimed the slot.
    slots: Vec<Vec<Option<usize>>>,
    /// Free slot count per group.
    free: Vec<usize>,
    /// Per reading: whether it has been consumed.
    used: Vec<bool>,
}

impl MatchState {
    /// Creates a state with every slot free and every reading unused.
    pub fn new(groups: usize, rows: usize, events: usize) -> Self {
        Self {
            slots: vec![vec![None; rows]; groups],
            free: vec![rows; groups],
            used: vec![false; events],
        }
    }

    /// Whether `row` can still receive a reading for `group`.
    pub fn is_free(&self, group: usize, row: usize) -> bool {
        self.slots
            .get(group)
            .and_then(|slots| slots.get(row))
            .is_some_and(Option::is_none)
    }

    /// Whether `group` has any free row left.
    pub fn has_free(&self, group: usize) -> bool {
        self.free.get(group).is_some_and(|&n| n > 0)
    }

    /// Whether reading `event` has been consumed.
    pub fn is_used(&self, event: usize) -> bool {
        self.used.get(event).copied().unwrap_or(false)
    }

    /// Reading that claimed `row` in `group`, if any.
    pub fn claimant(&self, group: usize, row: usize) -> Option<usize> {
        self.slots.get(group).and_then(|s| s.get(row)).copied().flatten()
    }

    /// Claims `row` in `group` for `event`.
    ///
    /// Returns `false` and changes nothing if the slot is taken, the reading
    /// is already used, or either index is out of range.
    pub fn claim(&mut self, group: usize, row: usize, event: usize) -> bool {
        if !self.is_free(group, row) || event >= self.used.len() || self.used[event] {
            return false;
        }
        self.slots[group][row] = Some(event);
        self.free[group] -= 1;
        self.used[event] = true;
        true
    }

    /// Finds the free row of `group` closest to `at`.
    ///
    /// `base` must be sorted ascending. Equal distances resolve to the
    /// lowest row index.
    pub fn nearest_free(
        &self,
        group: usize,
        base: &[NaiveDateTime],
        at: NaiveDateTime,
    ) -> Option<usize> {
        if !self.has_free(group) {
            return None;
        }
        let split = base.partition_point(|t| *t < at);

        let left = (0..split)
            .rev()
            .find(|&i| self.is_free(group, i))
            .map(|i| {
                // Prefer the earliest free row among equal timestamps.
                (0..=i)
                    .rev()
                    .take_while(|&j| base[j] == base[i])
                    .filter(|&j| self.is_free(group, j))
                    .last()
                    .unwrap_or(i)
            });
        let right = (split..base.len()).find(|&i| self.is_free(group, i));

        match (left, right) {
            (Some(l), Some(r)) => {
                if at - base[l] <= base[r] - at {
                    Some(l)
                } else {
                    Some(r)
                }
            }
            (l, r) => l.or(r),
        }
    }
}

/// A reading paired with its classification and destination group.
#[derive(Debug, Clone, Copy)]
pub struct RoutedEvent<'a> {
    /// Position of the reading in the input slice.
    pub index: usize,
    pub reading: &'a EventReading,
    pub class: GrainClass,
    /// Destination group, or `None` when no group accepts `class`.
    pub group: Option<usize>,
}

/// One reading written into one base row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub event: usize,
    pub row: usize,
    pub group: usize,
}

/// What a strategy did with the readings it was given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub assignments: Vec<Assignment>,
    /// Readings dropped because their group had no free row left.
    pub exhausted: usize,
    /// Readings rejected by the grain-change cooldown.
    pub cooldown_rejected: usize,
    /// Readings whose classification is routed to no group.
    pub unrouted: usize,
}

/// An algorithm that pairs routed readings with base rows.
///
/// Implementations must record every pairing in `state` via
/// [`MatchState::claim`] and report it in the returned outcome.
pub trait MatchStrategy {
    /// Assigns readings to rows of `base` (timestamps, sorted ascending).
    fn assign(
        &self,
        base: &[NaiveDateTime],
        events: &[RoutedEvent<'_>],
        state: &mut MatchState,
    ) -> MatchOutcome;
}

/// Per-reading greedy nearest-row matching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreedyNearest {
    /// When set, a reading whose grain differs from the previously accepted
    /// reading's grain is rejected if it comes less than this long after it.
    pub cooldown: Option<Duration>,
}

impl GreedyNearest {
    pub const fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown: Some(cooldown),
        }
    }
}

impl MatchStrategy for GreedyNearest {
    fn assign(
        &self,
        base: &[NaiveDateTime],
        events: &[RoutedEvent<'_>],
        state: &mut MatchState,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        let mut exhausted = vec![false; state.slots.len()];
        let mut last_accepted: Option<(String, NaiveDateTime)> = None;

        for event in events {
            let Some(group) = event.group else {
                outcome.unrouted += 1;
                continue;
            };
            if exhausted[group] {
                outcome.exhausted += 1;
                continue;
            }

            let grain = event.reading.grain_key();
            let at = event.reading.timestamp;
            if let (Some(window), Some((last_grain, last_at))) = (self.cooldown, &last_accepted) {
                if *last_grain != grain && at - *last_at < window {
                    tracing::debug!(
                        event = event.index,
                        %at,
                        previous = %last_grain,
                        current = %grain,
                        "rejecting reading inside grain-change cooldown"
                    );
                    outcome.cooldown_rejected += 1;
                    continue;
                }
            }

            let Some(row) = state.nearest_free(group, base, at) else {
                tracing::warn!(group, event = event.index, "no free rows left for group");
                exhausted[group] = true;
                outcome.exhausted += 1;
                continue;
            };

            if state.claim(group, row, event.index) {
                outcome.assignments.push(Assignment {
                    event: event.index,
                    row,
                    group,
                });
                last_accepted = (!grain.is_empty()).then_some((grain, at));
            }
        }

        outcome
    }
}

/// Values written into one destination group, one entry per base row.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupColumns {
    pub name: String,
    pub grain: Vec<Option<String>>,
    pub moisture: Vec<Option<f64>>,
    pub nature: Vec<Option<f64>>,
    pub temperature: Vec<Option<f64>>,
}

impl GroupColumns {
    fn empty(name: &str, rows: usize) -> Self {
        Self {
            name: name.to_string(),
            grain: vec![None; rows],
            moisture: vec![None; rows],
            nature: vec![None; rows],
            temperature: vec![None; rows],
        }
    }

    fn write(&mut self, row: usize, reading: &EventReading) {
        self.grain[row].clone_from(&reading.grain);
        self.moisture[row] = reading.moisture;
        self.nature[row] = reading.nature;
        self.temperature[row] = reading.temperature;
    }

    /// The numeric columns, for interpolation.
    pub fn numeric_mut(&mut self) -> [&mut Vec<Option<f64>>; 3] {
        [&mut self.moisture, &mut self.nature, &mut self.temperature]
    }
}

/// Counts describing a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub events: usize,
    pub matched: usize,
    pub exhausted: usize,
    pub cooldown_rejected: usize,
    pub unrouted: usize,
}

impl MatchStats {
    /// Readings that were not written anywhere.
    pub const fn unmatched(&self) -> usize {
        self.events - self.matched
    }
}

/// Result of reconciling readings onto a base series.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// One entry per destination group, in schema order.
    pub groups: Vec<GroupColumns>,
    /// Per base row: whether any group received a reading directly.
    pub direct: Vec<bool>,
    pub stats: MatchStats,
}

impl Reconciliation {
    /// Returns the columns of the group called `name`.
    pub fn group(&self, name: &str) -> Option<&GroupColumns> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Number of base rows.
    pub fn rows(&self) -> usize {
        self.direct.len()
    }
}

/// Classifies, routes and matches readings onto a base series.
#[derive(Debug, Clone)]
pub struct Reconciler<S = GreedyNearest> {
    schema: GroupSchema,
    rules: ClassificationRules,
    strategy: S,
}

impl Reconciler<GreedyNearest> {
    /// Creates a reconciler using greedy nearest matching.
    pub fn new(schema: GroupSchema, rules: ClassificationRules) -> Result<Self, CoreError> {
        Self::with_strategy(schema, rules, GreedyNearest::default())
    }
}

impl<S: MatchStrategy> Reconciler<S> {
    /// Creates a reconciler using a custom matching strategy.
    pub fn with_strategy(
        schema: GroupSchema,
        rules: ClassificationRules,
        strategy: S,
    ) -> Result<Self, CoreError> {
        rules.validate()?;
        Ok(Self {
            schema,
            rules,
            strategy,
        })
    }

    pub const fn schema(&self) -> &GroupSchema {
        &self.schema
    }

    pub const fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Merges `events` into `base`.
    ///
    /// Both inputs must be sorted ascending by timestamp; this is not
    /// checked. An empty base series is an error, an empty reading list is not.
    pub fn reconcile(
        &self,
        base: &Series,
        events: &[EventReading],
    ) -> Result<Reconciliation, CoreError> {
        if base.is_empty() {
            return Err(CoreError::EmptySeries {
                what: "base series",
            });
        }

        let timestamps = base.timestamps();
        let routed: Vec<RoutedEvent<'_>> = events
            .iter()
            .enumerate()
            .map(|(index, reading)| {
                let class = self
                    .rules
                    .classify(reading.grain.as_deref(), reading.moisture);
                RoutedEvent {
                    index,
                    reading,
                    class,
                    group: self.schema.route(class),
                }
            })
            .collect();

        let mut state = MatchState::new(self.schema.groups().len(), base.len(), events.len());
        let outcome = self.strategy.assign(&timestamps, &routed, &mut state);

        let mut groups: Vec<GroupColumns> = self
            .schema
            .groups()
            .iter()
            .map(|g| GroupColumns::empty(&g.name, base.len()))
            .collect();
        let mut direct = vec![false; base.len()];
        for assignment in &outcome.assignments {
            groups[assignment.group].write(assignment.row, &events[assignment.event]);
            direct[assignment.row] = true;
        }

        let stats = MatchStats {
            events: events.len(),
            matched: outcome.assignments.len(),
            exhausted: outcome.exhausted,
            cooldown_rejected: outcome.cooldown_rejected,
            unrouted: outcome.unrouted,
        };
        tracing::info!(
            events = stats.events,
            matched = stats.matched,
            unmatched = stats.unmatched(),
            exhausted = stats.exhausted,
            cooldown_rejected = stats.cooldown_rejected,
            "reconciled lab readings"
        );

        Ok(Reconciliation {
            groups,
            direct,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    use crate::types::Record;

    fn ts(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn base(minutes: &[i64]) -> Series {
        Series {
            columns: vec![],
            records: minutes.iter().map(|&m| Record::new(ts(m))).collect(),
        }
    }

    fn reading(minute: i64, grain: &str, moisture: f64) -> EventReading {
        EventReading {
            timestamp: ts(minute),
            grain: Some(grain.to_string()),
            moisture: Some(moisture),
            nature: Some(70.0),
            temperature: Some(21.0),
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(GroupSchema::default(), ClassificationRules::default()).unwrap()
    }

    fn assigned_rows(column: &[Option<f64>]) -> Vec<usize> {
        column
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|_| i))
            .collect()
    }

    #[test]
    fn routes_by_classification() {
        let base = base(&[0, 1, 2, 3]);
        let events = vec![
            reading(0, "wheat", 13.0),
            reading(1, "wheat", 16.0),
            reading(3, "wheat", 10.0),
        ];

        let result = reconciler().reconcile(&base, &events).unwrap();
        let dry = result.group("dry").unwrap();
        let wet = result.group("wet").unwrap();
        assert_eq!(assigned_rows(&dry.moisture), vec![0, 3]);
        assert_eq!(assigned_rows(&wet.moisture), vec![1]);
        assert_eq!(dry.grain[0].as_deref(), Some("wheat"));
        assert_eq!(result.direct, vec![true, true, false, true]);
        assert_eq!(result.stats.matched, 3);
        assert_eq!(result.stats.unmatched(), 0);
    }

    #[test]
    fn dry_and_wet_slots_are_independent() {
        let base = base(&[0, 10]);
        let events = vec![reading(0, "raps", 8.0), reading(0, "raps", 12.0)];

        let result = reconciler().reconcile(&base, &events).unwrap();
        assert_eq!(result.group("dry").unwrap().moisture[0], Some(8.0));
        assert_eq!(result.group("wet").unwrap().moisture[0], Some(12.0));
    }

    #[test]
    fn earlier_reading_claims_shared_nearest_row() {
        let base = base(&[0, 10, 20]);
        // Both readings are closest to minute 10; the first one wins it.
        let events = vec![reading(9, "wheat", 13.0), reading(11, "wheat", 13.5)];

        let result = reconciler().reconcile(&base, &events).unwrap();
        let dry = result.group("dry").unwrap();
        assert_eq!(dry.moisture[1], Some(13.0));
        assert_eq!(dry.moisture[2], Some(13.5));
        assert_eq!(dry.moisture[0], None);
    }

    #[test]
    fn ties_go_to_the_earliest_row() {
        let base = base(&[0, 10]);
        let events = vec![reading(5, "wheat", 13.0)];

        let result = reconciler().reconcile(&base, &events).unwrap();
        assert_eq!(assigned_rows(&result.group("dry").unwrap().moisture), vec![0]);
    }

    #[test]
    fn exhausted_group_drops_remaining_readings() {
        let base = base(&[0, 1]);
        let events = vec![
            reading(0, "wheat", 13.0),
            reading(1, "wheat", 13.0),
            reading(2, "wheat", 13.0),
            reading(2, "wheat", 17.0),
        ];

        let result = reconciler().reconcile(&base, &events).unwrap();
        assert_eq!(result.stats.matched, 3);
        assert_eq!(result.stats.exhausted, 1);
        assert_eq!(result.stats.unmatched(), 1);
        // The wet group still had room.
        assert_eq!(result.group("wet").unwrap().moisture[1], Some(17.0));
    }

    #[test]
    fn no_row_receives_two_readings_per_group() {
        let base = base(&[0, 5, 10, 15, 20]);
        let events: Vec<_> = (0..8)
            .map(|i| reading(i * 2, "wheat", if i % 2 == 0 { 13.0 } else { 15.0 }))
            .collect();

        let result = reconciler().reconcile(&base, &events).unwrap();
        // Four dry and four wet readings fit in five rows per group, and
        // none of them overwrote another.
        assert_eq!(result.stats.matched, 8);
        for group in &result.groups {
            let filled = group.moisture.iter().filter(|v| v.is_some()).count();
            assert_eq!(filled, 4, "group {}", group.name);
        }
    }

    #[test]
    fn cooldown_rejects_quick_grain_changes() {
        let base = base(&[0, 30, 60, 90, 150, 240]);
        let events = vec![
            reading(0, "wheat", 13.0),
            reading(60, "raps", 8.0),
            reading(150, "raps", 8.5),
        ];
        let strategy = GreedyNearest::with_cooldown(Duration::hours(2));
        let reconciler = Reconciler::with_strategy(
            GroupSchema::default(),
            ClassificationRules::default(),
            strategy,
        )
        .unwrap();

        let result = reconciler.reconcile(&base, &events).unwrap();
        let dry = result.group("dry").unwrap();
        assert_eq!(dry.moisture[0], Some(13.0));
        assert_eq!(dry.moisture[2], None);
        assert_eq!(dry.moisture[4], Some(8.5));
        assert_eq!(result.stats.cooldown_rejected, 1);
    }

    #[test]
    fn cooldown_disabled_by_default() {
        let base = base(&[0, 60]);
        let events = vec![reading(0, "wheat", 13.0), reading(60, "raps", 8.0)];

        let result = reconciler().reconcile(&base, &events).unwrap();
        assert_eq!(result.stats.matched, 2);
    }

    #[test]
    fn empty_base_is_an_error() {
        let err = reconciler()
            .reconcile(&Series::default(), &[reading(0, "wheat", 13.0)])
            .unwrap_err();
        assert_eq!(err, CoreError::EmptySeries { what: "base series" });
    }

    #[test]
    fn empty_readings_are_fine() {
        let result = reconciler().reconcile(&base(&[0, 1]), &[]).unwrap();
        assert_eq!(result.stats, MatchStats::default());
        assert_eq!(result.direct, vec![false, false]);
    }

    #[test]
    fn unrouted_class_is_counted() {
        let schema = GroupSchema::new(vec![DestinationGroup::new("dry", [GrainClass::Dry])]).unwrap();
        let reconciler = Reconciler::new(schema, ClassificationRules::default()).unwrap();
        let result = reconciler
            .reconcile(&base(&[0]), &[reading(0, "wheat", 16.0)])
            .unwrap();
        assert_eq!(result.stats.unrouted, 1);
        assert_eq!(result.stats.unmatched(), 1);
    }

    #[test]
    fn schema_validation() {
        assert_eq!(GroupSchema::new(vec![]).unwrap_err(), CoreError::EmptySchema);
        assert!(matches!(
            GroupSchema::new(vec![
                DestinationGroup::new("dry", [GrainClass::Dry]),
                DestinationGroup::new("dry", [GrainClass::Wet]),
            ]),
            Err(CoreError::DuplicateGroup { .. })
        ));
        assert!(matches!(
            GroupSchema::new(vec![
                DestinationGroup::new("dry", [GrainClass::Dry]),
                DestinationGroup::new("all", [GrainClass::Dry, GrainClass::Wet]),
            ]),
            Err(CoreError::AmbiguousRoute { .. })
        ));
    }

    #[test]
    fn schema_serde_validates() {
        let json = r#"[{"name":"dry","accepts":["dry","overdry"]},{"name":"wet","accepts":["wet"]}]"#;
        let schema: GroupSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema, GroupSchema::default());

        let dup = r#"[{"name":"dry","accepts":["dry"]},{"name":"dry","accepts":["wet"]}]"#;
        assert!(serde_json::from_str::<GroupSchema>(dup).is_err());
    }

    #[test]
    fn nearest_free_skips_claimed_rows() {
        let stamps: Vec<_> = [0, 10, 20, 30].iter().map(|&m| ts(m)).collect();
        let mut state = MatchState::new(1, stamps.len(), 3);
        assert_eq!(state.nearest_free(0, &stamps, ts(12)), Some(1));
        assert!(state.claim(0, 1, 0));
        assert!(!state.claim(0, 1, 1));
        assert_eq!(state.nearest_free(0, &stamps, ts(12)), Some(2));
        assert_eq!(state.nearest_free(0, &stamps, ts(45)), Some(3));
        assert_eq!(state.claimant(0, 1), Some(0));
        assert!(state.is_used(0));
        assert!(!state.is_used(1));
    }

    #[test]
    fn nearest_free_prefers_lowest_index_among_duplicates() {
        let stamps = vec![ts(0), ts(0), ts(20)];
        let state = MatchState::new(1, stamps.len(), 1);
        assert_eq!(state.nearest_free(0, &stamps, ts(5)), Some(0));
    }

    /// Takes the first free row regardless of time.
    struct FirstFree;

    impl MatchStrategy for FirstFree {
        fn assign(
            &self,
            base: &[NaiveDateTime],
            events: &[RoutedEvent<'_>],
            state: &mut MatchState,
        ) -> MatchOutcome {
            let mut outcome = MatchOutcome::default();
            for event in events {
                let Some(group) = event.group else {
                    outcome.unrouted += 1;
                    continue;
                };
                let Some(row) = (0..base.len()).find(|&r| state.is_free(group, r)) else {
                    outcome.exhausted += 1;
                    continue;
                };
                if state.claim(group, row, event.index) {
                    outcome.assignments.push(Assignment {
                        event: event.index,
                        row,
                        group,
                    });
                }
            }
            outcome
        }
    }

    #[test]
    fn custom_strategy_plugs_in() {
        let reconciler = Reconciler::with_strategy(
            GroupSchema::default(),
            ClassificationRules::default(),
            FirstFree,
        )
        .unwrap();
        let result = reconciler
            .reconcile(&base(&[0, 10, 20]), &[reading(20, "wheat", 13.0)])
            .unwrap();
        assert_eq!(result.group("dry").unwrap().moisture[0], Some(13.0));
    }
}
