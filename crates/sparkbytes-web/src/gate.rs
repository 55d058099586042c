use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use sparkbytes_core::api::CallContext;
use sparkbytes_core::model::{GateState, Requirement, Session, LOGIN_PATH};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::AppError;
use crate::AppState;

/// The browser behind the current request. Backend calls made on its behalf
/// forward its cookies and are cancelled if the request is dropped.
pub struct Visitor {
    pub ctx: CallContext,
    _cancel_on_drop: DropGuard,
}

impl Visitor {
    pub fn new(cookie: Option<String>) -> Self {
        let cancel = CancellationToken::new();
        Self {
            ctx: CallContext::new(cookie).with_cancel(cancel.clone()),
            _cancel_on_drop: cancel.drop_guard(),
        }
    }

    /// Value of the credential cookie, used to key per-visitor state.
    pub fn credential(&self, state: &AppState) -> Option<String> {
        self.ctx
            .cookie_value(&state.config.api.session_cookie)
            .map(str::to_string)
    }
}

impl FromRequestParts<Arc<AppState>> for Visitor {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let cookies: Vec<&str> = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let cookie = (!cookies.is_empty()).then(|| cookies.join("; "));
        Ok(Self::new(cookie))
    }
}

/// Run the session gate for a page. Nothing protected is rendered until
/// this returns `Ok`.
pub async fn admit(
    state: &AppState,
    visitor: &Visitor,
    requirement: Requirement,
) -> Result<Session, AppError> {
    match state.sessions.evaluate(&visitor.ctx, requirement).await {
        GateState::Allowed(session) => Ok(session),
        GateState::Redirecting(target) => {
            tracing::debug!(?requirement, to = target.path(), "session gate redirect");
            Err(AppError::redirect(target.path()))
        }
        GateState::Checking => Err(AppError::redirect(LOGIN_PATH)),
    }
}
