//! Submit-once actions: state machine, in-flight guard and flash messages.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, CallContext, FavoriteOutcome, ALREADY_FAVORITED};
use crate::error::{Result, SparkError};

pub const ALREADY_SUBMITTING: &str = "A request is already in progress. Please wait.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Submitting,
    Succeeded(String),
    Failed(String),
}

impl MutationState {
    /// Move to `Submitting`. Refused while a submission is in progress.
    pub fn begin(&mut self) -> bool {
        if matches!(self, Self::Submitting) {
            return false;
        }
        *self = Self::Submitting;
        true
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        *self = Self::Succeeded(message.into());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = Self::Failed(message.into());
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Succeeded(m) | Self::Failed(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// A [`Flash`] describing the settled state, if any.
    pub fn flash(&self) -> Option<Flash> {
        match self {
            Self::Succeeded(m) => Some(Flash::success(m.clone())),
            Self::Failed(m) => Some(Flash::error(m.clone())),
            _ => None,
        }
    }
}

/// Run one submission: `Idle → Submitting → Succeeded | Failed`.
/// No retries; the call either completes or the error is reported.
pub async fn submit<T, Fut>(
    call: Fut,
    on_success: impl FnOnce(T) -> String,
    fallback: &str,
) -> MutationState
where
    Fut: Future<Output = Result<T>>,
{
    let mut state = MutationState::Idle;
    state.begin();
    match call.await {
        Ok(value) => state.succeed(on_success(value)),
        Err(e) => {
            tracing::warn!(error = %e, "submission failed");
            state.fail(e.user_message(fallback));
        }
    }
    state
}

/// Add an event to favorites. `on_success` runs exactly once on a 2xx and
/// never on a conflict or failure.
pub async fn favorite_event(
    api: &ApiClient,
    event_id: i64,
    ctx: &CallContext,
    on_success: impl FnOnce(&str),
) -> MutationState {
    let mut state = MutationState::Idle;
    state.begin();
    match api.add_favorite(event_id, ctx).await {
        Ok(FavoriteOutcome::Added(message)) => {
            on_success(&message);
            state.succeed(message);
        }
        Ok(FavoriteOutcome::AlreadyFavorited) => state.fail(ALREADY_FAVORITED),
        Err(e) => {
            tracing::warn!(event_id, error = %e, "favorite failed");
            state.fail(favorite_failure_message(&e));
        }
    }
    state
}

pub fn favorite_failure_message(e: &SparkError) -> String {
    match e.status() {
        Some(400) => e.user_message("Invalid request."),
        _ => e.user_message("Failed to favorite event."),
    }
}

/// Actions guarded against double submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateEvent,
    Rsvp,
    Favorite,
    CreateProfile,
    EditProfile,
    Login,
    Register,
}

/// Tracks which visitor is currently submitting which action.
#[derive(Debug, Default)]
pub struct InFlight {
    active: Mutex<HashSet<(String, Action)>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the same visitor already has this action in flight.
    pub fn try_begin(&self, visitor: &str, action: Action) -> Option<InFlightGuard<'_>> {
        let key = (visitor.to_string(), action);
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if !active.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard { owner: self, key })
    }

    pub fn is_active(&self, visitor: &str, action: Action) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&(visitor.to_string(), action))
    }
}

/// Releases the action when dropped.
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: (String, Action),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for FlashKind {
    type Err = SparkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(SparkError::Validation(format!("unknown flash kind '{other}'"))),
        }
    }
}

/// A one-shot status message shown after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub message: String,
    pub kind: FlashKind,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FlashKind::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FlashKind::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == FlashKind::Success
    }
}
