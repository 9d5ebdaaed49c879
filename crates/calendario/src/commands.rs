//! One-shot CLI commands against the schedule store.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::calendar::Month;
use crate::rules::RuleSet;
use crate::selection::SelectionCounts;
use crate::store::ScheduleStore;
use crate::types::{day_key, Schedule};

/// What a successful `submit` sent and got back
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub selected: Vec<String>,
    /// Fewer dates than the schedule allows, under rules that ask first
    pub below_cap: bool,
    pub ack: serde_json::Value,
}

/// Fetch a schedule and log its bounds, cap and used days.
///
/// Returns `None` while the backend has no bounds for it.
pub async fn show(store: &dyn ScheduleStore, id: &str) -> Result<Option<Schedule>> {
    let response = store
        .fetch_schedule(id)
        .await
        .with_context(|| format!("Failed to fetch schedule {id}"))?;

    let Some(schedule) = response.into_schedule() else {
        warn!(id = %id, "Schedule has no bounds yet");
        return Ok(None);
    };

    info!(
        id = %id,
        start = %schedule.start,
        end = %schedule.end,
        max = schedule.max,
        "Schedule"
    );
    for day in &schedule.used {
        info!(date = %day_key(*day), "Already used");
    }
    Ok(Some(schedule))
}

/// Validate `dates` as increments, in order, and submit them.
///
/// The first rejected date aborts before anything is sent.
pub async fn submit(
    store: &dyn ScheduleStore,
    rules: &RuleSet,
    id: &str,
    dates: &[NaiveDate],
) -> Result<SubmitOutcome> {
    let response = store
        .fetch_schedule(id)
        .await
        .with_context(|| format!("Failed to fetch schedule {id}"))?;
    let Some(schedule) = response.into_schedule() else {
        bail!("Schedule {id} has no bounds yet");
    };

    // Each date is checked while its own month is displayed
    let mut counts = SelectionCounts::new();
    for &date in dates {
        counts = counts
            .increment(date, &schedule, rules, Month::of(date))
            .with_context(|| format!("Cannot select {date}"))?;
    }

    let selected = counts.serialize();
    let below_cap = rules.needs_confirmation(counts.total(), schedule.max);
    if below_cap {
        warn!(
            selected = selected.len(),
            max = schedule.max,
            "Submitting fewer dates than allowed"
        );
    }

    let ack = store
        .submit_schedule(id, &selected)
        .await
        .with_context(|| format!("Failed to submit schedule {id}"))?;

    info!(id = %id, total = selected.len(), ack = %ack, "Dates updated successfully");
    Ok(SubmitOutcome {
        selected,
        below_cap,
        ack,
    })
}
