use chrono::{Datelike, NaiveDate};
use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::calendar::Month;
use crate::rules::{DayStatus, RuleSet};
use crate::selection::SelectionCounts;
use crate::types::{day_key, Schedule};

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Everything needed to draw one month of a schedule
pub struct CalendarPage<'a> {
    pub id: &'a str,
    pub schedule: &'a Schedule,
    pub rules: &'a RuleSet,
    pub counts: &'a SelectionCounts,
    pub view: Month,
    pub notice: Option<&'a str>,
}

/// Path of a schedule's calendar, with the id encoded as one segment
pub fn calendar_path(id: &str) -> String {
    format!("/calendar/{}", urlencoding::encode(id))
}

/// Link to a schedule's calendar showing `view`
pub fn calendar_url(id: &str, view: Month) -> String {
    format!("{}?month={}", calendar_path(id), view)
}

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container { (body) }
            }
        }
    }
}

pub fn render_calendar(page: &CalendarPage) -> Markup {
    let selected = page.counts.serialize();
    let total = page.counts.total();
    let path = calendar_path(page.id);

    layout(
        "Calendario",
        html! {
            @if let Some(notice) = page.notice {
                div.notice role="alert" { (notice) }
            }
            div.toolbar {
                a.nav href=(calendar_url(page.id, page.view.prev())) { "‹ Back" }
                h2.month-label { (page.view.label()) }
                a.nav href=(calendar_url(page.id, page.view.next())) { "Next ›" }
            }
            div.stats {
                span #"total-count" { (total) }
                " / " (page.schedule.max) " dates selected"
            }
            table.month {
                thead {
                    tr {
                        @for name in WEEKDAYS {
                            th { (name) }
                        }
                    }
                }
                tbody {
                    @for week in page.view.weeks() {
                        tr {
                            @for day in week {
                                (render_day(page, day))
                            }
                        }
                    }
                }
            }
            div.selected {
                h3 { "Selected dates:" }
                ul #"selected-dates" {
                    @for date in &selected {
                        li { (date) }
                    }
                }
            }
            div.actions {
                form method="post" action={(path) "/submit"} {
                    input type="hidden" name="month" value=(page.view.to_string());
                    button.primary type="submit" { "Update dates" }
                }
                form method="post" action={(path) "/reload"} {
                    button type="submit" { "Reload" }
                }
            }
        },
    )
}

fn render_day(page: &CalendarPage, day: NaiveDate) -> Markup {
    let status = page.rules.classify(day, page.schedule, page.view);
    let count = page.counts.get(day);
    let key = day_key(day);
    let path = calendar_path(page.id);

    let class = match status {
        DayStatus::Start | DayStatus::End => "day boundary",
        DayStatus::OutOfRange | DayStatus::Blocked(_) => "day disabled",
        DayStatus::Selectable => "day",
    };

    html! {
        td class=(class) data-date=(key) {
            div.day-label {
                @match status {
                    DayStatus::Start => { "Start Date" }
                    DayStatus::End => { "End Date" }
                    _ => { (day.day()) }
                }
            }
            @if status == DayStatus::Selectable {
                div.day-controls {
                    form method="post" action={(path) "/remove/" (key)} {
                        input type="hidden" name="month" value=(page.view.to_string());
                        button type="submit" disabled[count == 0] { "–" }
                    }
                    form method="post" action={(path) "/add/" (key)} {
                        input type="hidden" name="month" value=(page.view.to_string());
                        button type="submit" { "+" }
                    }
                }
            }
            @if count > 0 {
                div.day-count { "Count: " (count) }
            }
        }
    }
}

/// Shown while a schedule has no bounds yet
pub fn render_loading() -> Markup {
    layout(
        "Calendario",
        html! {
            p.loading { "Loading..." }
        },
    )
}

/// Ask before submitting fewer dates than allowed
pub fn render_confirm(id: &str, total: u32, max: u32, view: Month) -> Markup {
    layout(
        "Confirm dates",
        html! {
            div.confirm {
                p {
                    "You selected " (total) " of " (max) " dates. Submit anyway?"
                }
                form method="post" action={(calendar_path(id)) "/submit"} {
                    input type="hidden" name="month" value=(view.to_string());
                    input type="hidden" name="confirm" value="yes";
                    button.primary type="submit" { "Submit" }
                }
                a href=(calendar_url(id, view)) { "Keep editing" }
            }
        },
    )
}

pub fn render_error(message: &str) -> Markup {
    layout(
        "Error",
        html! {
            div.error {
                h2 { "Something went wrong" }
                p { (message) }
            }
        },
    )
}

const CSS: &str = r#"
* {
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    margin: 0;
    color: #222;
    background: #fafafa;
}

.container {
    max-width: 960px;
    margin: 0 auto;
    padding: 24px;
}

.toolbar {
    display: flex;
    align-items: center;
    justify-content: space-between;
    margin-bottom: 12px;
}

.nav {
    text-decoration: none;
    color: #333;
    padding: 6px 12px;
    border: 1px solid #ccc;
    border-radius: 4px;
}

.stats {
    color: #666;
    margin-bottom: 12px;
}

.notice {
    background: #fff3cd;
    border: 1px solid #ffe08a;
    padding: 10px 14px;
    margin-bottom: 16px;
}

table.month {
    width: 100%;
    border-collapse: collapse;
    table-layout: fixed;
}

table.month th {
    padding: 6px;
    font-size: 0.85em;
    color: #555;
}

.day {
    height: 90px;
    border: 1px solid #ddd;
    background: white;
    text-align: center;
    vertical-align: middle;
    font-weight: bold;
}

.day.boundary {
    background: red;
    color: white;
}

.day.disabled {
    background: #dddddd;
}

.day-controls {
    display: flex;
    gap: 5px;
    justify-content: center;
    margin-top: 5px;
}

.day-controls form {
    margin: 0;
}

.day-count {
    font-size: 0.8em;
    font-weight: normal;
}

.actions {
    display: flex;
    gap: 8px;
    margin-top: 16px;
}

button.primary {
    background: #1f6feb;
    color: white;
    border: none;
    padding: 8px 16px;
    border-radius: 4px;
}

.error {
    color: #a40000;
}
"#;
