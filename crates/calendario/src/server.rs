use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::calendar::Month;
use crate::html::{self, calendar_path, calendar_url, CalendarPage};
use crate::rules::RuleSet;
use crate::selection::{SelectionCounts, SelectionError};
use crate::store::{self, ScheduleStore, StoreError};
use crate::types::{day_key, Schedule};

const SUBMIT_OK: &str = "Dates updated successfully!";

/// One schedule being edited
#[derive(Debug, Clone)]
pub struct Session {
    pub schedule: Schedule,
    pub counts: SelectionCounts,
    /// Shown once on the next render
    pub notice: Option<String>,
}

impl Session {
    fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            counts: SelectionCounts::new(),
            notice: None,
        }
    }
}

/// Application state shared across requests
pub struct AppState {
    pub store: Arc<dyn ScheduleStore>,
    pub rules: RuleSet,
    pub default_id: String,
    pub sessions: RwLock<HashMap<String, Session>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ScheduleStore>, rules: RuleSet, default_id: String) -> Self {
        Self {
            store,
            rules,
            default_id,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Make sure a session exists for `id`, fetching the schedule on first use.
    ///
    /// Returns `false` while the backend has no bounds for this schedule.
    async fn ensure_session(&self, id: &str) -> Result<bool, StoreError> {
        store::check_id(id)?;
        if self.sessions.read().await.contains_key(id) {
            return Ok(true);
        }

        let response = self.store.fetch_schedule(id).await?;
        let Some(schedule) = response.into_schedule() else {
            debug!(id = %id, "Schedule has no bounds yet");
            return Ok(false);
        };

        info!(
            id = %id,
            start = %schedule.start,
            end = %schedule.end,
            max = schedule.max,
            used = schedule.used.len(),
            "Schedule loaded"
        );
        self.sessions
            .write()
            .await
            .entry(id.to_string())
            .or_insert_with(|| Session::new(schedule));
        Ok(true)
    }
}

/// Backend failures, rendered as a 502 page; unusable ids are a 404
pub struct AppError(StoreError);

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::InvalidId(id) => {
                debug!(id = %id, "Rejecting schedule id");
                StatusCode::NOT_FOUND
            }
            err => {
                error!(error = %err, "Backend request failed");
                StatusCode::BAD_GATEWAY
            }
        };
        let markup = html::render_error(&self.0.to_string());
        (status, Html(markup.into_string())).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NavForm {
    month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    month: Option<String>,
    confirm: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub id: String,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub max: u32,
    pub total: u32,
    pub selected_dates: Vec<String>,
}

/// Displayed month: the requested one, or the month containing the start date
fn resolve_view(month: Option<&str>, schedule: &Schedule) -> Month {
    month
        .and_then(|m| m.parse::<Month>().ok())
        .filter(|m| m.has_full_grid())
        .unwrap_or_else(|| Month::of(schedule.start))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/calendar/{id}", get(calendar_handler))
        .route("/calendar/{id}/add/{date}", post(add_handler))
        .route("/calendar/{id}/remove/{date}", post(remove_handler))
        .route("/calendar/{id}/submit", post(submit_handler))
        .route("/calendar/{id}/reload", post(reload_handler))
        .route("/api/calendar/{id}", get(api_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

/// Start the web server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        url = %format!("http://{}{}", addr, calendar_path(&state.default_id)),
        "Server running"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Render one month of a schedule
async fn calendar_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, AppError> {
    if !state.ensure_session(&id).await? {
        return Ok(Html(html::render_loading().into_string()).into_response());
    }

    let mut sessions = state.sessions.write().await;
    let Some(session) = sessions.get_mut(&id) else {
        // Dropped by a concurrent reload
        return Ok(Redirect::to(&calendar_path(&id)).into_response());
    };

    let notice = session.notice.take();
    let page = CalendarPage {
        id: &id,
        schedule: &session.schedule,
        rules: &state.rules,
        counts: &session.counts,
        view: resolve_view(query.month.as_deref(), &session.schedule),
        notice: notice.as_deref(),
    };
    Ok(Html(html::render_calendar(&page).into_string()).into_response())
}

/// Add one selection on a day
async fn add_handler(
    State(state): State<Arc<AppState>>,
    Path((id, date)): Path<(String, String)>,
    Form(form): Form<NavForm>,
) -> Result<Redirect, AppError> {
    update_counts(&state, &id, &date, form.month.as_deref(), |session, day, view| {
        match session
            .counts
            .increment(day, &session.schedule, &state.rules, view)
        {
            Ok(next) => session.counts = next,
            Err(err @ SelectionError::CapReached { .. }) => {
                info!(id = %id, date = %day, "Selection cap reached");
                session.notice = Some(err.to_string());
            }
            Err(err) => debug!(id = %id, error = %err, "Ignoring selection"),
        }
    })
    .await
}

/// Remove one selection from a day
async fn remove_handler(
    State(state): State<Arc<AppState>>,
    Path((id, date)): Path<(String, String)>,
    Form(form): Form<NavForm>,
) -> Result<Redirect, AppError> {
    update_counts(&state, &id, &date, form.month.as_deref(), |session, day, _| {
        session.counts = session.counts.decrement(day);
    })
    .await
}

/// Apply `apply` to the session of `id`, then redirect back to the calendar
async fn update_counts(
    state: &AppState,
    id: &str,
    date: &str,
    month: Option<&str>,
    apply: impl FnOnce(&mut Session, NaiveDate, Month),
) -> Result<Redirect, AppError> {
    if !state.ensure_session(id).await? {
        return Ok(Redirect::to(&calendar_path(id)));
    }

    let mut sessions = state.sessions.write().await;
    let Some(session) = sessions.get_mut(id) else {
        return Ok(Redirect::to(&calendar_path(id)));
    };

    let view = resolve_view(month, &session.schedule);
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(day) => apply(session, day, view),
        Err(_) => debug!(id = %id, date = %date, "Ignoring malformed date"),
    }

    Ok(Redirect::to(&calendar_url(id, view)))
}

/// Send the current selection to the backend
async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<SubmitForm>,
) -> Result<Response, AppError> {
    if !state.ensure_session(&id).await? {
        return Ok(Redirect::to(&calendar_path(&id)).into_response());
    }

    let (dates, max, view) = {
        let sessions = state.sessions.read().await;
        let Some(session) = sessions.get(&id) else {
            return Ok(Redirect::to(&calendar_path(&id)).into_response());
        };
        (
            session.counts.serialize(),
            session.schedule.max,
            resolve_view(form.month.as_deref(), &session.schedule),
        )
    };

    let total = dates.len() as u32;
    let confirmed = form.confirm.as_deref() == Some("yes");
    if !confirmed && state.rules.needs_confirmation(total, max) {
        return Ok(Html(html::render_confirm(&id, total, max, view).into_string()).into_response());
    }

    let ack = state.store.submit_schedule(&id, &dates).await?;
    info!(id = %id, total, ack = %ack, "Dates submitted");

    if let Some(session) = state.sessions.write().await.get_mut(&id) {
        session.notice = Some(SUBMIT_OK.to_string());
    }

    Ok(Redirect::to(&calendar_url(&id, view)).into_response())
}

/// Forget the local selection and fetch the schedule again
async fn reload_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Redirect {
    if let Some(session) = state.sessions.write().await.remove(&id) {
        let dropped = session.counts.total();
        if dropped > 0 {
            warn!(id = %id, dropped, "Discarding unsubmitted selections");
        }
    }
    Redirect::to(&calendar_path(&id))
}

/// Return the state of a schedule as JSON
async fn api_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleSummary>, AppError> {
    if !state.ensure_session(&id).await? {
        return Ok(Json(ScheduleSummary {
            id,
            loading: true,
            start: None,
            end: None,
            max: 0,
            total: 0,
            selected_dates: Vec::new(),
        }));
    }

    let sessions = state.sessions.read().await;
    let session = sessions.get(&id);
    Ok(Json(ScheduleSummary {
        loading: session.is_none(),
        start: session.map(|s| day_key(s.schedule.start)),
        end: session.map(|s| day_key(s.schedule.end)),
        max: session.map_or(0, |s| s.schedule.max),
        total: session.map_or(0, |s| s.counts.total()),
        selected_dates: session.map(|s| s.counts.serialize()).unwrap_or_default(),
        id,
    }))
}

/// Everything else goes to the default schedule
async fn fallback_handler(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::to(&calendar_path(&state.default_id))
}
