//! Selection rules: which calendar days may receive a selection.
//!
//! A [`RuleSet`] is plain data. The checks never look at the current
//! selection counts, so the same answer comes back for a given day no matter
//! how often it has been picked already. The cap is enforced separately in
//! [`crate::selection`].

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::calendar::Month;
use crate::types::Schedule;

/// Named rule presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Two days of padding before the start, any weekday, no submit prompt
    #[default]
    Classic,

    /// One day of padding, weekdays of the displayed month only, used days
    /// excluded, prompt before submitting fewer dates than allowed
    Strict,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Classic => write!(f, "classic"),
            Variant::Strict => write!(f, "strict"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown rule variant '{0}' (expected 'classic' or 'strict')")]
pub struct UnknownVariant(String);

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Variant::Classic),
            "strict" => Ok(Variant::Strict),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Why a day cannot be selected
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("it is the start date")]
    StartDate,
    #[error("it is the end date")]
    EndDate,
    #[error("it is before the selectable range")]
    BeforeRange,
    #[error("it is after the end date")]
    AfterRange,
    #[error("it is already used")]
    AlreadyUsed,
    #[error("it falls on a weekend")]
    Weekend,
    #[error("it is outside the displayed month")]
    OtherMonth,
}

/// How a day cell is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Start,
    End,
    OutOfRange,
    Blocked(Rejection),
    Selectable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
    /// Days before `start` that still count as in range
    pub padding_days: u32,
    pub exclude_weekends: bool,
    pub restrict_to_view_month: bool,
    pub exclude_used: bool,
    /// Ask before submitting fewer dates than the cap
    pub confirm_partial: bool,
}

impl From<Variant> for RuleSet {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Classic => RuleSet {
                padding_days: 2,
                exclude_weekends: false,
                restrict_to_view_month: false,
                exclude_used: false,
                confirm_partial: false,
            },
            Variant::Strict => RuleSet {
                padding_days: 1,
                exclude_weekends: true,
                restrict_to_view_month: true,
                exclude_used: true,
                confirm_partial: true,
            },
        }
    }
}

impl RuleSet {
    /// Earliest day that is not before the range
    pub fn earliest(&self, schedule: &Schedule) -> NaiveDate {
        schedule
            .start
            .checked_sub_days(Days::new(u64::from(self.padding_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Check whether `date` may receive a selection while `view` is displayed
    pub fn check(&self, date: NaiveDate, schedule: &Schedule, view: Month) -> Result<(), Rejection> {
        if date == schedule.start {
            return Err(Rejection::StartDate);
        }
        if date == schedule.end {
            return Err(Rejection::EndDate);
        }
        if date < self.earliest(schedule) {
            return Err(Rejection::BeforeRange);
        }
        if date > schedule.end {
            return Err(Rejection::AfterRange);
        }
        if self.exclude_used && schedule.used.contains(&date) {
            return Err(Rejection::AlreadyUsed);
        }
        if self.exclude_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Err(Rejection::Weekend);
        }
        if self.restrict_to_view_month && !view.contains(date) {
            return Err(Rejection::OtherMonth);
        }
        Ok(())
    }

    pub fn can_select(&self, date: NaiveDate, schedule: &Schedule, view: Month) -> bool {
        self.check(date, schedule, view).is_ok()
    }

    pub fn classify(&self, date: NaiveDate, schedule: &Schedule, view: Month) -> DayStatus {
        match self.check(date, schedule, view) {
            Ok(()) => DayStatus::Selectable,
            Err(Rejection::StartDate) => DayStatus::Start,
            Err(Rejection::EndDate) => DayStatus::End,
            Err(Rejection::BeforeRange | Rejection::AfterRange) => DayStatus::OutOfRange,
            Err(reason) => DayStatus::Blocked(reason),
        }
    }

    /// Whether submitting `total` out of `max` dates needs an explicit confirmation
    pub fn needs_confirmation(&self, total: u32, max: u32) -> bool {
        self.confirm_partial && total < max
    }
}
