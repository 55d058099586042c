//! One-shot list fetching with a manual retry.

use std::future::Future;

use crate::error::Result;

/// The lists a page can show, with their wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Events,
    PostedEvents,
    Rsvps,
    Favorites,
}

impl ListKind {
    pub fn loading_message(&self) -> &'static str {
        match self {
            Self::Events => "Loading events...",
            Self::PostedEvents => "Loading your events...",
            Self::Rsvps => "Loading your RSVP events...",
            Self::Favorites => "Loading favorite events...",
        }
    }

    pub fn empty_message(&self) -> &'static str {
        match self {
            Self::Events => "No events available. Check back later!",
            Self::PostedEvents => "You haven't posted any events yet.",
            Self::Rsvps => "You have not RSVP'd to any events yet.",
            Self::Favorites => "No favorite events found.",
        }
    }

    /// Shown when the backend failed without saying why.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Events => "Failed to fetch events.",
            Self::PostedEvents => "Failed to fetch your events.",
            Self::Rsvps => "Failed to fetch RSVP events.",
            Self::Favorites => "Failed to fetch favorite events",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState<T> {
    Loading,
    Failed(String),
    Loaded(Vec<T>),
}

impl<T> ListState<T> {
    pub fn from_result(result: Result<Vec<T>>, kind: ListKind) -> Self {
        match result {
            Ok(items) => Self::Loaded(items),
            Err(e) => {
                if e.is_transport() {
                    tracing::warn!(list = ?kind, error = %e, "list fetch failed");
                } else {
                    tracing::info!(list = ?kind, error = %e, "backend refused list");
                }
                Self::Failed(e.user_message(kind.failure_message()))
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(m) => Some(m),
            _ => None,
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Self::Loaded(items) => items,
            _ => &[],
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Loaded(items) => items,
            _ => Vec::new(),
        }
    }
}

/// A list bound to the GET that fills it. Each `load` re-issues the same
/// call and replaces the data wholesale.
pub struct ListResource<T, F> {
    kind: ListKind,
    fetch: F,
    state: ListState<T>,
}

impl<T, F, Fut> ListResource<T, F>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    pub fn new(kind: ListKind, fetch: F) -> Self {
        Self {
            kind,
            fetch,
            state: ListState::Loading,
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn state(&self) -> &ListState<T> {
        &self.state
    }

    pub fn into_state(self) -> ListState<T> {
        self.state
    }

    pub async fn load(&mut self) -> &ListState<T> {
        self.state = ListState::Loading;
        let result = (self.fetch)().await;
        self.state = ListState::from_result(result, self.kind);
        &self.state
    }
}
