//! Per-day selection counts and the pure reducers over them.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::calendar::Month;
use crate::rules::{Rejection, RuleSet};
use crate::types::{day_key, parse_day, Schedule};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{date} cannot be selected: {reason}")]
    Rejected { date: NaiveDate, reason: Rejection },

    #[error("You can only select {max} dates in total.")]
    CapReached { max: u32 },
}

/// How many times each day has been selected.
///
/// Days with a zero count are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCounts {
    counts: BTreeMap<NaiveDate, u32>,
}

impl SelectionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a flat list of days, one count per occurrence
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut counts = BTreeMap::new();
        for date in dates {
            *counts.entry(date).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Inverse of [`serialize`](Self::serialize). Returns `None` on any unparseable day.
    pub fn from_serialized<S: AsRef<str>>(dates: &[S]) -> Option<Self> {
        let days = dates
            .iter()
            .map(|s| parse_day(s.as_ref()))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::from_dates(days))
    }

    pub fn get(&self, date: NaiveDate) -> u32 {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Days with a positive count, in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.counts.iter().map(|(date, count)| (*date, *count))
    }

    /// Add one selection on `date`.
    ///
    /// The day must pass the rule checks for `view`, and the total must still
    /// be below `schedule.max`.
    pub fn increment(
        &self,
        date: NaiveDate,
        schedule: &Schedule,
        rules: &RuleSet,
        view: Month,
    ) -> Result<Self, SelectionError> {
        rules
            .check(date, schedule, view)
            .map_err(|reason| SelectionError::Rejected { date, reason })?;

        if self.total() >= schedule.max {
            return Err(SelectionError::CapReached { max: schedule.max });
        }

        let mut next = self.clone();
        *next.counts.entry(date).or_insert(0) += 1;
        Ok(next)
    }

    /// Remove one selection from `date`; a no-op when there is none
    pub fn decrement(&self, date: NaiveDate) -> Self {
        let mut next = self.clone();
        if let Some(count) = next.counts.get_mut(&date) {
            *count -= 1;
            if *count == 0 {
                next.counts.remove(&date);
            }
        }
        next
    }

    /// Flatten into ascending `YYYY-MM-DD` strings, one per selection
    pub fn serialize(&self) -> Vec<String> {
        self.iter()
            .flat_map(|(date, count)| std::iter::repeat(day_key(date)).take(count as usize))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Variant;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> Schedule {
        Schedule::new(ymd(2024, 1, 10), ymd(2024, 1, 20), 3)
    }

    fn jan() -> Month {
        Month::of(ymd(2024, 1, 1))
    }

    fn classic() -> RuleSet {
        RuleSet::from(Variant::Classic)
    }

    #[test]
    fn test_same_day_up_to_cap() {
        let s = schedule();
        let rules = classic();
        let day = ymd(2024, 1, 15);

        let mut counts = SelectionCounts::new();
        for _ in 0..3 {
            counts = counts.increment(day, &s, &rules, jan()).unwrap();
        }

        assert_eq!(counts.get(day), 3);
        assert_eq!(counts.iter().collect::<Vec<_>>(), vec![(day, 3)]);
        assert_eq!(
            counts.serialize(),
            vec!["2024-01-15", "2024-01-15", "2024-01-15"]
        );
        assert_eq!(
            counts.increment(day, &s, &rules, jan()),
            Err(SelectionError::CapReached { max: 3 })
        );
    }

    #[test]
    fn test_cap_applies_across_days() {
        let s = schedule();
        let rules = classic();
        let counts = SelectionCounts::from_dates([ymd(2024, 1, 11), ymd(2024, 1, 12), ymd(2024, 1, 13)]);
        assert_eq!(
            counts.increment(ymd(2024, 1, 14), &s, &rules, jan()),
            Err(SelectionError::CapReached { max: 3 })
        );
    }

    #[test]
    fn test_rejection_wins_over_cap() {
        let s = Schedule::new(ymd(2024, 1, 10), ymd(2024, 1, 20), 0);
        let err = SelectionCounts::new()
            .increment(s.start, &s, &classic(), jan())
            .unwrap_err();
        assert_eq!(
            err,
            SelectionError::Rejected {
                date: s.start,
                reason: Rejection::StartDate
            }
        );
        assert_eq!(err.to_string(), "2024-01-10 cannot be selected: it is the start date");
    }

    #[test]
    fn test_cap_message() {
        let err = SelectionError::CapReached { max: 4 };
        assert_eq!(err.to_string(), "You can only select 4 dates in total.");
    }

    #[test]
    fn test_increment_leaves_original_untouched() {
        let s = schedule();
        let before = SelectionCounts::new();
        let after = before.increment(ymd(2024, 1, 12), &s, &classic(), jan()).unwrap();
        assert!(before.is_empty());
        assert_eq!(after.total(), 1);
    }

    #[test]
    fn test_decrement() {
        let day = ymd(2024, 1, 12);
        let counts = SelectionCounts::from_dates([day, day]);

        let counts = counts.decrement(day);
        assert_eq!(counts.get(day), 1);

        let counts = counts.decrement(day);
        assert_eq!(counts.get(day), 0);
        assert!(counts.is_empty());

        let counts = counts.decrement(day);
        assert!(counts.is_empty());
    }

    #[test]
    fn test_decrement_ignores_range_rules() {
        // A day outside the range can still lose a selection that got there
        let outside = ymd(2023, 12, 1);
        let counts = SelectionCounts::from_dates([outside]);
        assert!(counts.decrement(outside).is_empty());
    }

    #[test]
    fn test_serialize_sorted() {
        let counts = SelectionCounts::from_dates([
            ymd(2024, 1, 18),
            ymd(2024, 1, 11),
            ymd(2024, 1, 18),
            ymd(2023, 12, 31),
        ]);
        assert_eq!(
            counts.serialize(),
            vec!["2023-12-31", "2024-01-11", "2024-01-18", "2024-01-18"]
        );
    }

    #[test]
    fn test_from_serialized() {
        let counts = SelectionCounts::from_serialized(&["2024-01-12", "2024-01-12"]).unwrap();
        assert_eq!(counts.get(ymd(2024, 1, 12)), 2);
        assert!(SelectionCounts::from_serialized(&["2024-01-12", "bogus"]).is_none());
    }

    fn arb_day() -> impl Strategy<Value = NaiveDate> {
        // 2024-01-01 ..= 2024-01-31
        (1u32..=31).prop_map(|d| ymd(2024, 1, d))
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(NaiveDate),
        Remove(NaiveDate),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![arb_day().prop_map(Op::Add), arb_day().prop_map(Op::Remove)]
    }

    proptest! {
        #[test]
        fn prop_total_never_exceeds_cap(
            max in 0u32..8,
            strict in any::<bool>(),
            ops in prop::collection::vec(arb_op(), 0..60),
        ) {
            let s = Schedule::new(ymd(2024, 1, 10), ymd(2024, 1, 20), max);
            let variant = if strict { Variant::Strict } else { Variant::Classic };
            let rules = RuleSet::from(variant);

            let mut counts = SelectionCounts::new();
            for op in ops {
                counts = match op {
                    Op::Add(day) => counts.increment(day, &s, &rules, jan()).unwrap_or(counts),
                    Op::Remove(day) => counts.decrement(day),
                };
                prop_assert!(counts.total() <= max);
                prop_assert!(counts.iter().all(|(_, c)| c > 0));
            }
        }

        #[test]
        fn prop_serialize_sorted_with_total_len(days in prop::collection::vec(arb_day(), 0..40)) {
            let counts = SelectionCounts::from_dates(days);
            let flat = counts.serialize();
            prop_assert_eq!(flat.len() as u32, counts.total());
            prop_assert!(flat.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn prop_serialize_regroups(days in prop::collection::vec(arb_day(), 0..40)) {
            let counts = SelectionCounts::from_dates(days);
            let regrouped = SelectionCounts::from_serialized(&counts.serialize());
            prop_assert_eq!(regrouped, Some(counts));
        }

        #[test]
        fn prop_outside_range_never_selectable(offset in 1u64..400, padding in 0u32..4) {
            let s = schedule();
            let rules = RuleSet { padding_days: padding, ..classic() };
            let before = s.start - chrono::Days::new(u64::from(padding) + offset);
            let after = s.end + chrono::Days::new(offset);
            let any_view = Month::of(before);
            prop_assert!(SelectionCounts::new().increment(before, &s, &rules, any_view).is_err());
            prop_assert!(SelectionCounts::new().increment(after, &s, &rules, Month::of(after)).is_err());
        }
    }
}
