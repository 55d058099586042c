//! Typed client for the Spark Bytes REST backend.
//!
//! Every call carries a [`CallContext`]: the visitor's `Cookie` header and a
//! cancellation token tied to the page that issued it.

mod client;
mod envelope;

pub use client::{ApiClient, Created, FavoriteOutcome, LoginOutcome, ALREADY_FAVORITED};
pub use envelope::{Envelope, RawReply};

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Per-call credentials and cancellation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Raw `Cookie` header to forward, if the visitor sent one.
    pub cookie: Option<String>,
    pub cancel: CancellationToken,
}

impl CallContext {
    pub fn new(cookie: Option<String>) -> Self {
        Self {
            cookie: cookie.filter(|c| !c.trim().is_empty()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Value of one cookie out of the forwarded header.
    pub fn cookie_value(&self, name: &str) -> Option<&str> {
        cookie_value(self.cookie.as_deref()?, name)
    }
}

/// Find `name=value` in a `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// The two server checks behind the session gate.
pub trait SessionChecks: Send + Sync {
    /// `Ok(true)` on 2xx, `Ok(false)` when the backend explicitly rejects the
    /// credentials, `Err` when the answer is unknown.
    fn auth_check(&self, ctx: &CallContext) -> impl Future<Output = Result<bool>> + Send;

    /// Whether a profile exists for the authenticated visitor.
    fn profile_status(&self, ctx: &CallContext) -> impl Future<Output = Result<bool>> + Send;
}
