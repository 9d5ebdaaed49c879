use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Day key format used on the wire and in the UI
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Format a date as its `YYYY-MM-DD` day key
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

/// Parse a backend date string, keeping only the calendar day.
///
/// Accepts plain dates (`2024-01-10`), RFC 3339 timestamps
/// (`2024-01-10T00:00:00.000Z`) and naive date-times (`2024-01-10T00:00:00`).
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DAY_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// The bounds of one editing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// First day of the range (inclusive, never selectable itself)
    pub start: NaiveDate,

    /// Last day of the range (inclusive, never selectable itself)
    pub end: NaiveDate,

    /// Cap on the total number of selections
    pub max: u32,

    /// Days the backend reports as already used
    pub used: BTreeSet<NaiveDate>,
}

impl Schedule {
    pub fn new(start: NaiveDate, end: NaiveDate, max: u32) -> Self {
        Self {
            start,
            end,
            max,
            used: BTreeSet::new(),
        }
    }

    pub fn with_used(mut self, used: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.used.extend(used);
        self
    }
}

/// Body of `GET /{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub calendario: Option<Bounds>,

    /// Maximum number of selectable dates
    #[serde(default)]
    pub contador: u32,

    #[serde(
        rename = "getCalendario",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub get_calendario: Option<Vec<UsedDate>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    #[serde(default)]
    pub date_start: Option<String>,

    #[serde(default)]
    pub date_end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsedDate {
    pub date_ads: String,
}

impl ScheduleResponse {
    /// Convert into a [`Schedule`], or `None` while the bounds are missing
    pub fn into_schedule(self) -> Option<Schedule> {
        let bounds = self.calendario?;
        let start = parse_day(bounds.date_start.as_deref()?)?;
        let end = parse_day(bounds.date_end.as_deref()?)?;

        let used = self
            .get_calendario
            .unwrap_or_default()
            .into_iter()
            .filter_map(|u| {
                let day = parse_day(&u.date_ads);
                if day.is_none() {
                    warn!(date_ads = %u.date_ads, "Ignoring unparseable used date");
                }
                day
            });

        Some(Schedule::new(start, end, self.contador).with_used(used))
    }
}

/// Body of `POST /{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitRequest {
    #[serde(rename = "selectedDates")]
    pub selected_dates: Vec<String>,
}
