use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use sparkbytes_core::fetch::{ListKind, ListResource};
use sparkbytes_core::model::{Requirement, RsvpEvent, RsvpRequest, RsvpStatus};
use sparkbytes_core::mutation::{self, Action, Flash, ALREADY_SUBMITTING};

use crate::error::AppError;
use crate::gate::{self, Visitor};
use crate::page::{redirect_with, FlashQuery, Layout, ListView};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rsvpform", get(rsvp_form))
        .route("/rsvp", post(rsvp))
        .route("/all_rsvp", get(all_rsvp))
}

// -- Templates --

pub struct StatusOption {
    pub value: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "rsvp/form.html")]
struct RsvpFormTemplate {
    layout: Layout,
    event_id: i64,
    statuses: Vec<StatusOption>,
    error: Option<String>,
    success: Option<String>,
    redirect_ms: u64,
    redirect_secs: u64,
}

#[derive(Template)]
#[template(path = "rsvp/list.html")]
struct RsvpListTemplate {
    layout: Layout,
    list: ListView<RsvpEvent>,
}

// -- Form input --

#[derive(Deserialize)]
pub struct EventQuery {
    event_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RsvpInput {
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    rsvp_status: String,
}

fn parse_event_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|id| id.trim().parse().ok())
}

fn status_options(selected: &str) -> Vec<StatusOption> {
    RsvpStatus::ALL
        .iter()
        .map(|s| StatusOption {
            value: s.as_str(),
            selected: s.as_str() == selected,
        })
        .collect()
}

// -- Handlers --

async fn rsvp_form(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(query): Query<EventQuery>,
) -> Result<Response, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    let Some(event_id) = parse_event_id(query.event_id.as_deref()) else {
        return Ok(redirect_with("/events", &Flash::error("No event selected.")).into_response());
    };
    Ok(render_form(&state, event_id, "", None, None)?.into_response())
}

fn render_form(
    state: &AppState,
    event_id: i64,
    selected: &str,
    error: Option<String>,
    success: Option<String>,
) -> Result<Html<String>, AppError> {
    let redirect_ms = state.config.ui.rsvp_redirect_ms;
    let tmpl = RsvpFormTemplate {
        layout: Layout::new(state, true, None),
        event_id,
        statuses: status_options(selected),
        error,
        success,
        redirect_ms,
        redirect_secs: redirect_ms.div_ceil(1000),
    };
    Ok(Html(tmpl.render()?))
}

async fn rsvp(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Form(input): Form<RsvpInput>,
) -> Result<Response, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    let Some(event_id) = parse_event_id(Some(&input.event_id)) else {
        return Ok(redirect_with("/events", &Flash::error("No event selected.")).into_response());
    };

    let rsvp_status: RsvpStatus = match input.rsvp_status.parse() {
        Ok(status) => status,
        Err(e) => {
            let error = Some(e.user_message(""));
            return Ok(render_form(&state, event_id, "", error, None)?.into_response());
        }
    };

    let key = visitor.credential(&state).unwrap_or_default();
    let Some(_guard) = state.in_flight.try_begin(&key, Action::Rsvp) else {
        let error = Some(ALREADY_SUBMITTING.to_string());
        return Ok(render_form(&state, event_id, rsvp_status.as_str(), error, None)?.into_response());
    };

    let request = RsvpRequest {
        event_id,
        rsvp_status,
    };
    let outcome = mutation::submit(
        state.api.rsvp(&request, &visitor.ctx),
        |message| {
            tracing::info!(event_id, status = %rsvp_status, "rsvp recorded");
            message
        },
        "Failed to RSVP.",
    )
    .await;

    let selected = rsvp_status.as_str();
    let page = if outcome.is_success() {
        render_form(&state, event_id, selected, None, outcome.message().map(str::to_string))?
    } else {
        render_form(&state, event_id, selected, outcome.message().map(str::to_string), None)?
    };
    Ok(page.into_response())
}

async fn all_rsvp(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Profile).await?;
    let mut resource = ListResource::new(ListKind::Rsvps, || state.api.user_rsvps(&visitor.ctx));
    resource.load().await;
    let tmpl = RsvpListTemplate {
        layout: Layout::new(&state, true, flash.into_flash()),
        list: ListView::new(resource.into_state(), ListKind::Rsvps, "/all_rsvp"),
    };
    Ok(Html(tmpl.render()?))
}
