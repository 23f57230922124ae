use std::{fmt::Display, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use tokio::{sync::RwLock, task};

use weekplan_core::{
    store::ScheduleStore,
    Color, EditError, Event, EventEdit, Rejection, Schedule,
};

/// The one schedule this process serves, plus where it is saved.
pub struct AppState {
    schedule: RwLock<Schedule>,
    store: ScheduleStore,
}

impl AppState {
    pub fn new(schedule: Schedule, store: ScheduleStore) -> Self {
        Self {
            schedule: RwLock::new(schedule),
            store,
        }
    }

    /// Writes a snapshot on the blocking pool so the lock is not held
    /// during file I/O.
    pub async fn save(&self) -> Result<()> {
        let snapshot = self.schedule.read().await.clone();
        let store = self.store.clone();

        task::spawn_blocking(move || store.save(&snapshot)).await??;
        Ok(())
    }
}

type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/week", get(handle_week))
        .route("/week/grid", get(handle_grid))
        .route("/days/:date", get(handle_day))
        .route("/at", get(handle_at))
        .route("/events", post(handle_create))
        .route("/events/:index", put(handle_edit).delete(handle_delete))
        .route("/save", post(handle_save))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Unknown route") })
        .with_state(state)
}

fn error_response<E: Display>(status: StatusCode, err: E) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[derive(Deserialize)]
struct WeekQuery {
    #[serde(default)]
    ics: bool,
}

async fn handle_week(
    State(state): State<SharedState>,
    Query(query): Query<WeekQuery>,
) -> Response {
    let schedule = state.schedule.read().await;

    if query.ics {
        return (
            [("content-type", "text/calendar")],
            schedule.to_ics().to_string(),
        )
            .into_response();
    }

    Json(&*schedule).into_response()
}

async fn handle_grid(State(state): State<SharedState>) -> Response {
    Json(state.schedule.read().await.grid()).into_response()
}

async fn handle_day(State(state): State<SharedState>, Path(date): Path<NaiveDate>) -> Response {
    Json(state.schedule.read().await.events_for_day(date)).into_response()
}

#[derive(Deserialize)]
struct InstantQuery {
    instant: NaiveDateTime,
}

async fn handle_at(
    State(state): State<SharedState>,
    Query(query): Query<InstantQuery>,
) -> Response {
    Json(state.schedule.read().await.events_at(query.instant)).into_response()
}

#[derive(Deserialize)]
struct NewEvent {
    name: String,
    #[serde(default)]
    location: String,
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
    #[serde(default)]
    color: Color,
}

async fn handle_create(
    State(state): State<SharedState>,
    Json(new): Json<NewEvent>,
) -> Response {
    let mut schedule = state.schedule.write().await;

    let Some(date) = schedule.date_for(new.day) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("{} falls outside the supported calendar", new.day),
        );
    };

    let event = Event::new(
        new.name,
        new.location,
        date.and_time(new.start),
        date.and_time(new.end),
        new.color,
    );

    match schedule.add_event(event.clone()) {
        Ok(()) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(rejection) => error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection),
    }
}

#[derive(Deserialize)]
struct EditQuery {
    #[serde(default)]
    validate: bool,
}

async fn handle_edit(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
    Query(query): Query<EditQuery>,
    Json(edit): Json<EventEdit>,
) -> Response {
    // Gates are skipped on a plain edit, but reversed times are still refused.
    if !query.validate && edit.end <= edit.start {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, Rejection::EndNotAfterStart);
    }

    let mut schedule = state.schedule.write().await;

    let result = if query.validate {
        schedule.edit_event_checked(index, edit)
    } else {
        schedule.edit_event(index, edit)
    };

    match result {
        Ok(event) => Json(event).into_response(),
        Err(err @ EditError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, err),
        Err(err @ EditError::Rejected(_)) => error_response(StatusCode::UNPROCESSABLE_ENTITY, err),
    }
}

async fn handle_delete(State(state): State<SharedState>, Path(index): Path<usize>) -> Response {
    match state.schedule.write().await.remove_at(index) {
        Some(event) => {
            info!("Removed event `{}`", event.name);
            StatusCode::NO_CONTENT.into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, EditError::NotFound(index)),
    }
}

async fn handle_save(State(state): State<SharedState>) -> Response {
    match state.save().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("{err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;

    fn app(dir: &TempDir) -> (Router, SharedState) {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let store = ScheduleStore::new(dir.path().join("schedule.json"));
        let state = Arc::new(AppState::new(Schedule::new(monday), store));
        (router(Arc::clone(&state)), state)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        };

        router.clone().oneshot(request.unwrap()).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn post_event(router: &Router, name: &str, start: &str, end: &str) -> Response {
        send(router, Method::POST, "/events", Some(new_event(name, start, end))).await
    }

    fn new_event(name: &str, start: &str, end: &str) -> Value {
        json!({
            "name": name,
            "location": "HQ",
            "day": "Mon",
            "start": start,
            "end": end,
            "color": "Red",
        })
    }

    #[tokio::test]
    async fn create_query_and_reject() {
        let dir = TempDir::new().unwrap();
        let (router, _) = app(&dir);

        let created = post_event(&router, "A", "09:00:00", "10:00:00").await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(json_body(created).await["start"], "2024-01-01T09:00:00");

        let rejected = post_event(&router, "C", "09:00:00", "11:00:00").await;
        assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(rejected).await["error"]
            .as_str()
            .unwrap()
            .contains("60 minutes"));

        let day = send(&router, Method::GET, "/days/2024-01-01", None).await;
        assert_eq!(day.status(), StatusCode::OK);
        assert_eq!(json_body(day).await.as_array().unwrap().len(), 1);

        let at = send(&router, Method::GET, "/at?instant=2024-01-01T10:00:00", None).await;
        assert_eq!(json_body(at).await[0]["name"], "A");
    }

    #[tokio::test]
    async fn malformed_input_never_reaches_the_schedule() {
        let dir = TempDir::new().unwrap();
        let (router, state) = app(&dir);

        let bad_day = send(&router, Method::GET, "/days/not-a-date", None).await;
        assert!(bad_day.status().is_client_error());

        let mut body = new_event("A", "09:00:00", "10:00:00");
        body["day"] = json!("Someday");
        let bad_event = send(&router, Method::POST, "/events", Some(body)).await;
        assert!(bad_event.status().is_client_error());

        assert!(state.schedule.read().await.is_empty());
    }

    #[tokio::test]
    async fn edit_and_delete() {
        let dir = TempDir::new().unwrap();
        let (router, state) = app(&dir);

        post_event(&router, "A", "09:00:00", "10:00:00").await;
        post_event(&router, "B", "11:00:00", "12:00:00").await;

        let overlap = json!({
            "name": "B",
            "location": "HQ",
            "start": "09:00:00",
            "end": "11:00:00",
            "color": "Blue",
        });

        let refused = send(&router, Method::PUT, "/events/1?validate=true", Some(overlap.clone())).await;
        assert_eq!(refused.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let accepted = send(&router, Method::PUT, "/events/1", Some(overlap.clone())).await;
        assert_eq!(accepted.status(), StatusCode::OK);
        assert_eq!(json_body(accepted).await["color"], "Blue");

        let missing = send(&router, Method::PUT, "/events/9", Some(overlap)).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let deleted = send(&router, Method::DELETE, "/events/0", None).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.schedule.read().await.events()[0].name, "B");

        let gone = send(&router, Method::DELETE, "/events/4", None).await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn plain_edit_refuses_reversed_times() {
        let dir = TempDir::new().unwrap();
        let (router, state) = app(&dir);

        post_event(&router, "A", "09:00:00", "10:00:00").await;

        let reversed = json!({
            "name": "A",
            "location": "HQ",
            "start": "10:00:00",
            "end": "09:00:00",
            "color": "Red",
        });

        let refused = send(&router, Method::PUT, "/events/0", Some(reversed)).await;
        assert_eq!(refused.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json_body(refused).await["error"],
            Rejection::EndNotAfterStart.to_string()
        );
        assert_eq!(state.schedule.read().await.events()[0].duration_minutes(), 60);

        // Too short for the timing rules, but a plain edit does not check them.
        let short = json!({
            "name": "A",
            "location": "HQ",
            "start": "09:00:00",
            "end": "09:10:00",
            "color": "Red",
        });
        let accepted = send(&router, Method::PUT, "/events/0", Some(short)).await;
        assert_eq!(accepted.status(), StatusCode::OK);
        assert_eq!(state.schedule.read().await.events()[0].duration_minutes(), 10);
    }

    #[tokio::test]
    async fn week_grid_in_one_request() {
        let dir = TempDir::new().unwrap();
        let (router, _) = app(&dir);

        post_event(&router, "A", "09:00:00", "10:00:00").await;

        let grid = json_body(send(&router, Method::GET, "/week/grid", None).await).await;
        let slots = grid.as_array().unwrap();
        assert_eq!(slots.len(), 175);

        let find = |day: &str, time: &str| {
            slots
                .iter()
                .find(|slot| slot["day"] == day && slot["time"] == time)
                .unwrap()
        };

        assert_eq!(find("Mon", "10:00:00")["events"][0]["name"], "A");
        assert_eq!(find("Mon", "10:30:00")["events"].as_array().unwrap().len(), 0);
        assert_eq!(find("Sat", "15:00:00")["available"], true);
        assert_eq!(find("Sat", "15:30:00")["available"], false);
    }

    #[tokio::test]
    async fn create_past_the_calendar_is_refused() {
        let dir = TempDir::new().unwrap();
        let store = ScheduleStore::new(dir.path().join("schedule.json"));
        let state = Arc::new(AppState::new(Schedule::new(NaiveDate::MAX), store));
        let app = router(Arc::clone(&state));

        let mut body = new_event("A", "09:00:00", "10:00:00");
        body["day"] = json!("Tue");
        let refused = send(&app, Method::POST, "/events", Some(body)).await;
        assert_eq!(refused.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.schedule.read().await.is_empty());
    }

    #[tokio::test]
    async fn save_and_export() {
        let dir = TempDir::new().unwrap();
        let (router, state) = app(&dir);

        post_event(&router, "A", "09:00:00", "10:00:00").await;

        let saved = send(&router, Method::POST, "/save", None).await;
        assert_eq!(saved.status(), StatusCode::NO_CONTENT);
        let loaded = ScheduleStore::new(dir.path().join("schedule.json")).load().unwrap();
        assert_eq!(loaded, *state.schedule.read().await);

        let ics = send(&router, Method::GET, "/week?ics=true", None).await;
        let bytes = to_bytes(ics.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("BEGIN:VEVENT"));

        let week = json_body(send(&router, Method::GET, "/week", None).await).await;
        assert_eq!(week["week_start"], "2024-01-01");
        assert_eq!(week["events"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_schedule() {
        let dir = TempDir::new().unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let store = ScheduleStore::new(dir.path().join("missing").join("schedule.json"));
        let state = Arc::new(AppState::new(Schedule::new(monday), store));
        let app = router(Arc::clone(&state));

        post_event(&app, "A", "09:00:00", "10:00:00").await;

        let saved = send(&app, Method::POST, "/save", None).await;
        assert_eq!(saved.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.schedule.read().await.len(), 1);
    }

    #[tokio::test]
    async fn save_does_not_hold_the_lock() {
        let dir = TempDir::new().unwrap();
        let (router, state) = app(&dir);

        post_event(&router, "A", "09:00:00", "10:00:00").await;
        state.save().await.unwrap();

        assert!(state.schedule.try_write().is_ok());
        post_event(&router, "B", "11:00:00", "12:00:00").await;
        state.save().await.unwrap();

        let loaded = ScheduleStore::new(dir.path().join("schedule.json")).load().unwrap();
        assert_eq!(loaded.len(), 2);
    }
}
