use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use sparkbytes_core::api::{CallContext, LoginOutcome};
use sparkbytes_core::model::{
    Access, LoginRequest, RegisterRequest, Requirement, LOGIN_PATH,
};
use sparkbytes_core::mutation::{Action, Flash, ALREADY_SUBMITTING};

use crate::error::AppError;
use crate::gate::{self, Visitor};
use crate::page::{redirect_with, FlashQuery, Layout};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", post(logout))
}

// -- Templates --

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    layout: Layout,
    email: String,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
struct RegisterTemplate {
    layout: Layout,
    name: String,
    bu_id: String,
    email: String,
    error: Option<String>,
}

// -- Form input --

#[derive(Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    name: String,
    #[serde(default)]
    bu_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

// -- Handlers --

async fn login_form(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Guest).await?;
    render_login(&state, flash.into_flash(), String::new(), None)
}

fn render_login(
    state: &AppState,
    flash: Option<Flash>,
    email: String,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let tmpl = LoginTemplate {
        layout: Layout::new(state, false, flash),
        email,
        error,
    };
    Ok(Html(tmpl.render()?))
}

async fn login(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Form(input): Form<LoginInput>,
) -> Result<Response, AppError> {
    let request = match (LoginRequest {
        email: input.email.clone(),
        password: input.password,
    })
    .validate()
    {
        Ok(r) => r,
        Err(e) => {
            return Ok(render_login(&state, None, input.email, Some(e.user_message(""))).into_response())
        }
    };

    let key = format!("login:{}", request.email);
    let Some(_guard) = state.in_flight.try_begin(&key, Action::Login) else {
        return Ok(
            render_login(&state, None, request.email, Some(ALREADY_SUBMITTING.into()))
                .into_response(),
        );
    };

    let outcome = match state.api.login(&request, &visitor.ctx).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::info!(email = %request.email, error = %e, "login failed");
            let message = e.user_message("Login failed. Please try again.");
            return Ok(render_login(&state, None, request.email, Some(message)).into_response());
        }
    };

    tracing::info!(email = %request.email, "login successful");
    state.sessions.invalidate(&visitor.ctx).await;

    let set_cookies = credential_cookies(&state, &outcome);
    let Some(cookie) = forwarded_cookie(&set_cookies) else {
        let flash = Flash::error("Login failed: the server did not issue a session.");
        return Ok(redirect_with(LOGIN_PATH, &flash).into_response());
    };

    // Ask the backend where the new session belongs.
    let fresh = CallContext::new(Some(cookie)).with_cancel(visitor.ctx.cancel.clone());
    let session = state.sessions.refresh(&fresh).await;
    let mut response = match session.admit(Requirement::Guest) {
        Access::Redirect(target) => {
            redirect_with(target.path(), &Flash::success(outcome.message)).into_response()
        }
        Access::Allow => Redirect::to(LOGIN_PATH).into_response(),
    };
    for c in set_cookies {
        response
            .headers_mut()
            .append(SET_COOKIE, HeaderValue::from_str(&c)?);
    }
    Ok(response)
}

/// Cookies to hand the browser: the backend's own, or one carrying the token
/// it returned in the body.
fn credential_cookies(state: &AppState, outcome: &LoginOutcome) -> Vec<String> {
    if !outcome.set_cookies.is_empty() {
        return outcome.set_cookies.clone();
    }
    match &outcome.token {
        Some(token) => vec![format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            state.config.api.session_cookie, token
        )],
        None => Vec::new(),
    }
}

/// `Cookie` header equivalent of a set of `Set-Cookie` values.
fn forwarded_cookie(set_cookies: &[String]) -> Option<String> {
    let pairs: Vec<&str> = set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}

async fn register_form(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    gate::admit(&state, &visitor, Requirement::Guest).await?;
    let tmpl = RegisterTemplate {
        layout: Layout::new(&state, false, flash.into_flash()),
        name: String::new(),
        bu_id: String::new(),
        email: String::new(),
        error: None,
    };
    Ok(Html(tmpl.render()?))
}

async fn register(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
    Form(input): Form<RegisterInput>,
) -> Result<Response, AppError> {
    let rerender = |error: String| -> Result<Response, AppError> {
        let tmpl = RegisterTemplate {
            layout: Layout::new(&state, false, None),
            name: input.name.clone(),
            bu_id: input.bu_id.clone(),
            email: input.email.clone(),
            error: Some(error),
        };
        Ok(Html(tmpl.render()?).into_response())
    };

    let request = match (RegisterRequest {
        name: input.name.clone(),
        bu_id: input.bu_id.clone(),
        email: input.email.clone(),
        password: input.password.clone(),
    })
    .validate()
    {
        Ok(r) => r,
        Err(e) => return rerender(e.user_message("")),
    };

    let key = format!("register:{}", request.email);
    let Some(_guard) = state.in_flight.try_begin(&key, Action::Register) else {
        return rerender(ALREADY_SUBMITTING.into());
    };

    match state.api.register(&request, &visitor.ctx).await {
        Ok(message) => {
            tracing::info!(email = %request.email, "registered: {message}");
            Ok(redirect_with(LOGIN_PATH, &Flash::success("Registration successful!")).into_response())
        }
        Err(e) => rerender(e.user_message("Registration failed. Please try again.")),
    }
}

async fn logout(
    State(state): State<Arc<AppState>>,
    visitor: Visitor,
) -> Result<Response, AppError> {
    let mut set_cookies = match state.api.logout(&visitor.ctx).await {
        Ok(cookies) => cookies,
        Err(e) => {
            tracing::debug!(error = %e, "backend logout failed, clearing cookie locally");
            Vec::new()
        }
    };
    state.sessions.invalidate(&visitor.ctx).await;

    if set_cookies.is_empty() {
        set_cookies.push(format!(
            "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
            state.config.api.session_cookie
        ));
    }
    let mut response =
        redirect_with(LOGIN_PATH, &Flash::success("You have been logged out.")).into_response();
    for c in set_cookies {
        response
            .headers_mut()
            .append(SET_COOKIE, HeaderValue::from_str(&c)?);
    }
    Ok(response)
}
