use std::sync::Arc;

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::Local;
use sparkbytes_core::fetch::{ListKind, ListState};
use sparkbytes_core::model::{Event, EventForm, Requirement};
use sparkbytes_core::mutation::{self, Action, Flash, ALREADY_SUBMITTING};

use crate::error::AppError;
use crate::gate::{self, Visitor};
use crate::page::{diet_options, redirect_with, DietOption, FlashQuery, FormFields, Layout, ListView};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}/favorite", post(favorite))
        .route("/create-event", get(new_event_form).post(create_event))
        .route("/posted_events", get(posted_events))
}

// -- Templates --

#[derive(Template)]
#[template(path = "events/list.html")]
pub(crate) struct EventListTemplate {
    pub layout: Layout,
    pub heading: &'static str,
    pub list: ListView<Event>,
    /// RSVP and favorite buttons on each card.
    pub actions: bool,
}

#[derive(Template)]
#[template(path = "events/form.html")]
struct EventFormTemplate {
    layout: Layout,
    form: EventForm,
    diet: Vec<DietOption>,
    error: Option<String>,
    min_date: String,
}

// -- Handlers --

async fn list_events(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    let list = ListState::from_result(state.api.list_events(&visitor.ctx).await, ListKind::Events);
    let tmpl = EventListTemplate {
        layout: Layout::new(&state, true, flash.into_flash()),
        heading: "Upcoming Events",
        list: ListView::new(list, ListKind::Events, "/events"),
        actions: true,
    };
    Ok(Html(tmpl.render()?))
}

async fn posted_events(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    let list = ListState::from_result(
        state.api.user_events(&visitor.ctx).await,
        ListKind::PostedEvents,
    );
    let tmpl = EventListTemplate {
        layout: Layout::new(&state, true, flash.into_flash()),
        heading: "Your Posted Events",
        list: ListView::new(list, ListKind::PostedEvents, "/posted_events"),
        actions: false,
    };
    Ok(Html(tmpl.render()?))
}

async fn favorite(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;

    let key = visitor.credential(&state).unwrap_or_default();
    let Some(_guard) = state.in_flight.try_begin(&key, Action::Favorite) else {
        return Ok(redirect_with("/events", &Flash::error(ALREADY_SUBMITTING)).into_response());
    };

    let outcome = mutation::favorite_event(&state.api, id, &visitor.ctx, |message| {
        tracing::info!(event_id = id, "favorited: {message}");
    })
    .await;
    let flash = outcome
        .flash()
        .unwrap_or_else(|| Flash::error("Failed to favorite event."));
    Ok(redirect_with("/events", &flash).into_response())
}

async fn new_event_form(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    render_form(&state, flash.into_flash(), EventForm::default(), None)
}

fn render_form(
    state: &AppState,
    flash: Option<Flash>,
    form: EventForm,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let tmpl = EventFormTemplate {
        layout: Layout::new(state, true, flash),
        diet: diet_options(&form.dietary_needs),
        form,
        error,
        min_date: Local::now().date_naive().succ_opt().map(|d| d.to_string()).unwrap_or_default(),
    };
    Ok(Html(tmpl.render()?))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;

    let fields = FormFields(fields);
    let form = EventForm {
        title: fields.get("title"),
        description: fields.get("description"),
        event_date: fields.get("event_date"),
        start_time: fields.get("start_time"),
        end_time: fields.get("end_time"),
        location: fields.get("location"),
        address: fields.get("address"),
        quantity: fields.get("quantity"),
        dietary_needs: fields.all("dietary_needs"),
        event_type: fields.get("event_type"),
    };

    // Validation failures never reach the backend.
    let event = match form.validate(Local::now().date_naive()) {
        Ok(event) => event,
        Err(e) => return Ok(render_form(&state, None, form, Some(e.user_message(""))).into_response()),
    };

    let key = visitor.credential(&state).unwrap_or_default();
    let Some(_guard) = state.in_flight.try_begin(&key, Action::CreateEvent) else {
        return Ok(render_form(&state, None, form, Some(ALREADY_SUBMITTING.into())).into_response());
    };

    let title = event.title.clone();
    let outcome = mutation::submit(
        state.api.create_event(&event, &visitor.ctx),
        |created| {
            tracing::info!(event_id = ?created.event_id, "event created");
            format!("Event \"{title}\" created successfully!")
        },
        "Failed to create event.",
    )
    .await;

    match outcome.flash() {
        Some(flash) if flash.is_success() => {
            Ok(redirect_with("/create-event", &flash).into_response())
        }
        other => {
            let error = other.map(|f| f.message);
            Ok(render_form(&state, None, form, error).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use axum::http::StatusCode;
    use chrono::Duration;
    use serde_json::json;
    use sparkbytes_core::testing::{MockBackend, MockReply};

    fn event_form(date: &str, start: &str, end: &str) -> String {
        serde_urlencoded::to_string([
            ("title", "Pizza Night"),
            ("description", "Leftover pizza"),
            ("event_date", date),
            ("start_time", start),
            ("end_time", end),
            ("location", "CDS 1646"),
            ("address", "665 Commonwealth Ave"),
            ("quantity", "30"),
            ("dietary_needs", "Vegetarian"),
            ("dietary_needs", "Halal"),
        ])
        .unwrap()
    }

    fn tomorrow() -> String {
        (Local::now().date_naive() + Duration::days(1)).to_string()
    }

    #[tokio::test]
    async fn test_events_requires_login() {
        let mock = MockBackend::start().await;
        session(&mock, false, true);
        mock.reply("GET", "/events", MockReply::json(200, json!({"success": true, "events": []})));
        let resp = get_page(test_router(&mock), "/events").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/login");
        assert_eq!(mock.hits("GET", "/profile-status"), 0);
        assert_eq!(mock.hits("GET", "/events"), 0);
        let html = body_text(resp.into_body()).await;
        assert!(!html.contains("Upcoming Events"));
    }

    #[tokio::test]
    async fn test_events_requires_profile() {
        let mock = MockBackend::start().await;
        session(&mock, true, false);
        let resp = get_page(test_router(&mock), "/events").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/createprofile");
    }

    #[tokio::test]
    async fn test_events_listed_in_server_order() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply(
            "GET",
            "/events",
            MockReply::json(
                200,
                json!({"success": true, "events": [
                    {"event_id": 2, "title": "Second Bagels", "event_date": "2099-01-02",
                     "start_time": "09:00", "end_time": "10:00", "location": "GSU",
                     "dietary_needs": ["Vegan"]},
                    {"event_id": 1, "title": "First Pizza", "event_date": "2099-01-01"}
                ]}),
            ),
        );
        let resp = get_page(test_router(&mock), "/events").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        let second = html.find("Second Bagels").unwrap();
        let first = html.find("First Pizza").unwrap();
        assert!(second < first);
        assert!(html.contains("/rsvpform?event_id=2"));
        assert!(html.contains("/events/2/favorite"));
        assert_eq!(mock.last_cookie("/events").as_deref(), Some(COOKIE));
    }

    #[tokio::test]
    async fn test_events_empty_message() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply("GET", "/events", MockReply::json(200, json!([])));
        let html = body_text(get_page(test_router(&mock), "/events").await.into_body()).await;
        assert!(html.contains("No events available. Check back later!"));
    }

    #[tokio::test]
    async fn test_posted_events_error_has_retry() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply(
            "GET",
            "/user_events",
            MockReply::json(500, json!({"message": "Database unavailable"})),
        );
        let html = body_text(get_page(test_router(&mock), "/posted_events").await.into_body()).await;
        assert!(html.contains("Database unavailable"));
        assert!(html.contains("href=\"/posted_events\""));
        assert!(html.contains("Retry"));
    }

    #[tokio::test]
    async fn test_create_event_past_date_no_network_call() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        let today = Local::now().date_naive().to_string();
        let resp = post_form(test_router(&mock), "/create-event", &event_form(&today, "18:00", "19:00")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("The event date must be in the future."));
        assert_eq!(mock.hits("POST", "/events"), 0);
    }

    #[tokio::test]
    async fn test_create_event_end_before_start_no_network_call() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        let resp = post_form(
            test_router(&mock),
            "/create-event",
            &event_form(&tomorrow(), "18:00", "17:00"),
        )
        .await;
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("The end time must be after the start time."));
        // Entered values are kept.
        assert!(html.contains("value=\"Pizza Night\""));
        assert_eq!(mock.hits("POST", "/events"), 0);
    }

    #[tokio::test]
    async fn test_create_event_success_flash() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply(
            "POST",
            "/events",
            MockReply::json(201, json!({"message": "Event created successfully", "event_id": 5})),
        );
        let resp = post_form(
            test_router(&mock),
            "/create-event",
            &event_form(&tomorrow(), "18:00", "19:00"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let loc = location(&resp);
        assert!(loc.starts_with("/create-event?flash=Event+%22Pizza+Night%22+created+successfully%21"));

        let body = mock.last_body("/events").unwrap();
        assert_eq!(body["event_date"], json!(tomorrow()));
        assert_eq!(body["dietary_needs"], json!(["Vegetarian", "Halal"]));
        assert_eq!(body["quantity"], 30);
    }

    #[tokio::test]
    async fn test_create_event_server_error_shown() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply(
            "POST",
            "/events",
            MockReply::json(400, json!({"message": "The event date must be in the future."})),
        );
        let resp = post_form(
            test_router(&mock),
            "/create-event",
            &event_form(&tomorrow(), "18:00", "19:00"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp.into_body()).await;
        assert!(html.contains("The event date must be in the future."));
    }

    #[tokio::test]
    async fn test_favorite_conflict_flash() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply(
            "POST",
            "/favorites",
            MockReply::json(409, json!({"error": "duplicate"})),
        );
        let resp = post_form(test_router(&mock), "/events/9/favorite", "").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let loc = location(&resp);
        assert!(loc.starts_with("/events?flash=Event+is+already+in+favorites."));
        assert!(loc.ends_with("flash_kind=error"));
    }

    #[tokio::test]
    async fn test_favorite_success_flash() {
        let mock = MockBackend::start().await;
        session(&mock, true, true);
        mock.reply(
            "POST",
            "/favorites",
            MockReply::json(201, json!({"message": "Event favorited"})),
        );
        let resp = post_form(test_router(&mock), "/events/9/favorite", "").await;
        let loc = location(&resp);
        assert!(loc.starts_with("/events?flash=Event+favorited"));
        assert!(loc.ends_with("flash_kind=success"));
        assert_eq!(mock.last_body("/favorites"), Some(json!({"event_id": 9})));
    }
}
