pub mod auth;
pub mod events;
pub mod favorites;
pub mod profile;
pub mod rsvp;

use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, Json};
use axum::routing::get;
use axum::Router;
use sparkbytes_core::api::{CallContext, SessionChecks};

use crate::error::AppError;
use crate::gate::Visitor;
use crate::page::{FlashQuery, Layout};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(events::routes())
        .merge(rsvp::routes())
        .merge(favorites::routes())
        .merge(profile::routes())
        .fallback(not_found)
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    layout: Layout,
}

/// Public landing page. The session is looked up only to pick the navbar.
async fn home(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let session = state.sessions.get_session(&visitor.ctx).await;
    let tmpl = HomeTemplate {
        layout: Layout::new(&state, session.authenticated, flash.into_flash()),
    };
    Ok(Html(tmpl.render()?))
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let backend_ok = state.api.auth_check(&CallContext::default()).await.is_ok();

    let status = if backend_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if backend_ok { "ok" } else { "degraded" },
            "backend": if backend_ok { "reachable" } else { "unavailable" },
            "api_base_url": state.api.base_url(),
        })),
    )
}

async fn not_found() -> (StatusCode, Html<String>) {
    let body = r#"<!doctype html>
<html><head><title>404 · SparkBytes</title>
<style>body{font-family:system-ui;background:#fafafa;color:#222;display:flex;justify-content:center;align-items:center;height:100vh;margin:0}
.box{text-align:center}
h1{font-size:4rem;color:#c0392b;margin:0}
p{color:#777;margin:0.5rem 0 1.5rem}
a{color:#c0392b;text-decoration:none;padding:0.5rem 1rem;border:1px solid #ddd;border-radius:8px}</style>
</head><body><div class="box"><h1>404</h1><p>This page doesn't exist.</p><a href="/events">Back to events</a></div></body></html>"#;
    (StatusCode::NOT_FOUND, Html(body.to_string()))
}
