use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::envelope::RawReply;
use super::{CallContext, SessionChecks};
use crate::config::ApiConfig;
use crate::error::{Result, SparkError};
use crate::model::profile::ProfileBody;
use crate::model::{
    Event, LoginRequest, NewEvent, Profile, ProfileInput, RegisterRequest, RsvpEvent, RsvpRequest,
};

pub const ALREADY_FAVORITED: &str = "Event is already in favorites.";

/// HTTP client for the backend. Cheap to clone; the connection pool is
/// shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

/// Result of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub message: String,
    pub event_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Added(String),
    AlreadyFavorited,
}

/// A successful login. The credential comes back either as `Set-Cookie`
/// headers or as a `token` in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub message: String,
    pub set_cookies: Vec<String>,
    pub token: Option<String>,
}

#[derive(Deserialize)]
struct ProfileStatus {
    #[serde(
        rename = "hasProfile",
        alias = "has_profile",
        alias = "profile_complete",
        default
    )]
    has_profile: bool,
}

#[derive(Serialize)]
struct FavoriteRequest {
    event_id: i64,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| SparkError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issue one request and read the whole response, bounded by the fixed
    /// timeout and the caller's cancellation token.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        ctx: &CallContext,
    ) -> Result<RawReply> {
        let url = self.url(path);
        let mut req = self.http.request(method.clone(), &url);
        if let Some(cookie) = &ctx.cookie {
            req = req.header(COOKIE, cookie);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let call = async {
            let resp = req.send().await?;
            let status = resp.status();
            let set_cookies = resp
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect();
            let body = resp.bytes().await?.to_vec();
            Ok::<_, SparkError>(RawReply {
                status,
                body,
                set_cookies,
            })
        };

        let reply = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(SparkError::Cancelled),
            res = tokio::time::timeout(self.timeout, call) => match res {
                Ok(inner) => inner,
                Err(_) => Err(SparkError::Timeout),
            },
        };

        match &reply {
            Ok(r) => tracing::debug!(%method, path, status = r.status.as_u16(), "backend call"),
            Err(e) => tracing::debug!(%method, path, error = %e, "backend call failed"),
        }
        reply
    }

    async fn get(&self, path: &str, ctx: &CallContext) -> Result<RawReply> {
        self.execute::<()>(Method::GET, path, None, ctx).await
    }

    // -- Lists --

    pub async fn list_events(&self, ctx: &CallContext) -> Result<Vec<Event>> {
        self.get("/events", ctx).await?.list()
    }

    pub async fn user_events(&self, ctx: &CallContext) -> Result<Vec<Event>> {
        self.get("/user_events", ctx).await?.list()
    }

    pub async fn user_rsvps(&self, ctx: &CallContext) -> Result<Vec<RsvpEvent>> {
        self.get("/user_rsvps", ctx).await?.list()
    }

    pub async fn favorites(&self, ctx: &CallContext) -> Result<Vec<Event>> {
        self.get("/favorites", ctx).await?.list()
    }

    // -- Mutations --

    pub async fn create_event(&self, event: &NewEvent, ctx: &CallContext) -> Result<Created> {
        let reply = self
            .execute(Method::POST, "/events", Some(event), ctx)
            .await?;
        let (envelope, _) = reply.checked()?;
        Ok(Created {
            message: envelope
                .text()
                .unwrap_or_else(|| "Event created successfully".to_string()),
            event_id: envelope.event_id,
        })
    }

    pub async fn rsvp(&self, request: &RsvpRequest, ctx: &CallContext) -> Result<String> {
        let reply = self
            .execute(Method::POST, "/rsvp", Some(request), ctx)
            .await?;
        let (envelope, _) = reply.checked()?;
        Ok(envelope
            .text()
            .unwrap_or_else(|| "RSVP successful!".to_string()))
    }

    /// `409 Conflict` is an outcome, not an error.
    pub async fn add_favorite(&self, event_id: i64, ctx: &CallContext) -> Result<FavoriteOutcome> {
        let reply = self
            .execute(
                Method::POST,
                "/favorites",
                Some(&FavoriteRequest { event_id }),
                ctx,
            )
            .await?;
        if reply.status == StatusCode::CONFLICT {
            return Ok(FavoriteOutcome::AlreadyFavorited);
        }
        let (envelope, _) = reply.checked()?;
        Ok(FavoriteOutcome::Added(
            envelope
                .text()
                .unwrap_or_else(|| "Event added to favorites!".to_string()),
        ))
    }

    pub async fn create_profile(&self, input: &ProfileInput, ctx: &CallContext) -> Result<String> {
        let reply = self
            .execute(Method::POST, "/create_profile", Some(input), ctx)
            .await?;
        let (envelope, _) = reply.checked()?;
        Ok(envelope
            .text()
            .unwrap_or_else(|| "Profile created successfully".to_string()))
    }

    pub async fn edit_profile(&self, input: &ProfileInput, ctx: &CallContext) -> Result<String> {
        let reply = self
            .execute(Method::PUT, "/edit_profile", Some(input), ctx)
            .await?;
        let (envelope, _) = reply.checked()?;
        Ok(envelope
            .text()
            .unwrap_or_else(|| "Profile updated successfully".to_string()))
    }

    pub async fn get_profile(&self, ctx: &CallContext) -> Result<Profile> {
        let body: ProfileBody = self.get("/get_profile", ctx).await?.json()?;
        Ok(body.into())
    }

    // -- Accounts --

    pub async fn login(&self, request: &LoginRequest, ctx: &CallContext) -> Result<LoginOutcome> {
        let reply = self
            .execute(Method::POST, "/login", Some(request), ctx)
            .await?;
        let (envelope, reply) = reply.checked()?;
        Ok(LoginOutcome {
            message: envelope
                .text()
                .unwrap_or_else(|| "Login successful".to_string()),
            set_cookies: reply.set_cookies,
            token: envelope.token.filter(|t| !t.is_empty()),
        })
    }

    pub async fn register(&self, request: &RegisterRequest, ctx: &CallContext) -> Result<String> {
        let reply = self
            .execute(Method::POST, "/register", Some(request), ctx)
            .await?;
        let (envelope, _) = reply.checked()?;
        Ok(envelope
            .text()
            .unwrap_or_else(|| "User registered successfully".to_string()))
    }

    /// Returns any `Set-Cookie` headers the backend sent to clear the
    /// credential.
    pub async fn logout(&self, ctx: &CallContext) -> Result<Vec<String>> {
        let reply = self
            .execute::<()>(Method::POST, "/logout", None, ctx)
            .await?;
        let (_, reply) = reply.checked()?;
        Ok(reply.set_cookies)
    }
}

impl SessionChecks for ApiClient {
    async fn auth_check(&self, ctx: &CallContext) -> Result<bool> {
        let reply = self.get("/auth-check", ctx).await?;
        match reply.status {
            s if s.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            _ => reply.checked().map(|_| false),
        }
    }

    async fn profile_status(&self, ctx: &CallContext) -> Result<bool> {
        let status: ProfileStatus = self.get("/profile-status", ctx).await?.json()?;
        Ok(status.has_profile)
    }
}
