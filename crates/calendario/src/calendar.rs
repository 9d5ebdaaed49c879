//! Month grid layout and navigation.

use chrono::{Datelike, Days, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// A calendar month, stored as its first day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    /// The month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self(date - Days::new(u64::from(date.day0())))
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    pub fn last_day(self) -> NaiveDate {
        // Only the last representable month has no successor
        self.0
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.0.year() && date.month() == self.0.month()
    }

    pub fn next(self) -> Self {
        self.0
            .checked_add_months(Months::new(1))
            .map(Self)
            .unwrap_or(self)
    }

    pub fn prev(self) -> Self {
        self.0
            .checked_sub_months(Months::new(1))
            .map(Self)
            .unwrap_or(self)
    }

    /// Human readable label, e.g. "January 2024"
    pub fn label(self) -> String {
        self.0.format("%B %Y").to_string()
    }

    /// Whether every day of the padded grid is a representable date
    pub fn has_full_grid(self) -> bool {
        let last = self.last_day();
        let lead = u64::from(self.0.weekday().num_days_from_sunday());
        let trail = u64::from(6 - last.weekday().num_days_from_sunday());
        self.0.checked_sub_days(Days::new(lead)).is_some()
            && last.checked_add_days(Days::new(trail)).is_some()
    }

    /// Whole weeks (Sunday first) covering the month, including the
    /// neighbouring days needed to fill the first and last week.
    ///
    /// Weeks that would leave chrono's date range are left out.
    pub fn weeks(self) -> Vec<[NaiveDate; 7]> {
        let first = self.0;
        let last = self.last_day();
        let lead = u64::from(first.weekday().num_days_from_sunday());

        let mut weeks = Vec::with_capacity(6);
        let mut next = first.checked_sub_days(Days::new(lead));
        while let Some(week_start) = next.filter(|day| *day <= last) {
            let Some(week) = week_from(week_start) else {
                break;
            };
            weeks.push(week);
            next = week_start.checked_add_days(Days::new(7));
        }
        weeks
    }
}

fn week_from(start: NaiveDate) -> Option<[NaiveDate; 7]> {
    let mut week = [start; 7];
    for (offset, day) in (0u64..).zip(week.iter_mut()) {
        *day = start.checked_add_days(Days::new(offset))?;
    }
    Some(week)
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for Month {
    type Err = chrono::ParseError;

    /// Parses `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_of_normalizes_to_first_day() {
        assert_eq!(Month::of(ymd(2024, 1, 17)).first_day(), ymd(2024, 1, 1));
        assert_eq!(Month::of(ymd(2024, 2, 29)).last_day(), ymd(2024, 2, 29));
        assert_eq!(Month::of(ymd(2023, 2, 3)).last_day(), ymd(2023, 2, 28));
    }

    #[test]
    fn test_month_navigation_crosses_years() {
        let dec = Month::of(ymd(2023, 12, 5));
        assert_eq!(dec.next(), Month::of(ymd(2024, 1, 1)));
        assert_eq!(dec.next().prev(), dec);
        assert_eq!(Month::of(ymd(2024, 1, 31)).prev(), dec);
    }

    #[test]
    fn test_month_contains() {
        let jan = Month::of(ymd(2024, 1, 1));
        assert!(jan.contains(ymd(2024, 1, 31)));
        assert!(!jan.contains(ymd(2023, 12, 31)));
        assert!(!jan.contains(ymd(2025, 1, 15)));
    }

    #[test]
    fn test_month_display_and_parse() {
        let month: Month = "2024-03".parse().unwrap();
        assert_eq!(month.first_day(), ymd(2024, 3, 1));
        assert_eq!(month.to_string(), "2024-03");
        assert_eq!(month.label(), "March 2024");
        assert!("2024-13".parse::<Month>().is_err());
        assert!("march".parse::<Month>().is_err());
    }

    #[test]
    fn test_weeks_january_2024() {
        // 2024-01-01 is a Monday, 2024-01-31 a Wednesday
        let weeks = Month::of(ymd(2024, 1, 1)).weeks();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0][0], ymd(2023, 12, 31));
        assert_eq!(weeks[0][1], ymd(2024, 1, 1));
        assert_eq!(weeks[4][6], ymd(2024, 2, 3));
    }

    #[test]
    fn test_weeks_exact_fit() {
        // February 2015 starts on a Sunday and has 28 days
        let weeks = Month::of(ymd(2015, 2, 1)).weeks();
        assert_eq!(weeks.len(), 4);
        assert_eq!(weeks[0][0], ymd(2015, 2, 1));
        assert_eq!(weeks[3][6], ymd(2015, 2, 28));
    }

    #[test]
    fn test_grid_at_the_edges_of_the_calendar() {
        let first = Month::of(NaiveDate::MIN);
        assert_eq!(
            first.has_full_grid(),
            NaiveDate::MIN.weekday() == chrono::Weekday::Sun
        );

        let last = Month::of(NaiveDate::MAX);
        assert_eq!(last.last_day(), NaiveDate::MAX);
        assert_eq!(
            last.has_full_grid(),
            NaiveDate::MAX.weekday() == chrono::Weekday::Sat
        );

        for month in [first, last] {
            let weeks = month.weeks();
            let days: Vec<NaiveDate> = weeks.iter().flatten().copied().collect();
            assert!(days.windows(2).all(|pair| pair[0].succ_opt() == Some(pair[1])));
        }
        assert!(Month::of(ymd(2024, 1, 1)).has_full_grid());
    }

    #[test]
    fn test_weeks_are_contiguous() {
        let weeks = Month::of(ymd(2024, 6, 1)).weeks();
        let days: Vec<NaiveDate> = weeks.iter().flatten().copied().collect();
        for pair in days.windows(2) {
            assert_eq!(pair[0].succ_opt().unwrap(), pair[1]);
        }
    }
}
