use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::*;
use crate::api::{CallContext, SessionChecks};
use crate::config::SessionConfig;
use crate::error::{Result, SparkError};
use crate::model::{GateState, RedirectTarget, Requirement, Session};

#[derive(Debug, Clone, Copy)]
enum Answer {
    Yes,
    No,
    Fail,
}

impl Answer {
    fn to_result(self) -> Result<bool> {
        match self {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            Answer::Fail => Err(SparkError::Transport("connection refused".into())),
        }
    }
}

struct FakeChecks {
    auth: Mutex<Answer>,
    profile: Mutex<Answer>,
    profile_delay: Duration,
    auth_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl FakeChecks {
    fn new(auth: Answer, profile: Answer) -> Self {
        Self {
            auth: Mutex::new(auth),
            profile: Mutex::new(profile),
            profile_delay: Duration::ZERO,
            auth_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
        }
    }

    fn with_profile_delay(mut self, delay: Duration) -> Self {
        self.profile_delay = delay;
        self
    }

    fn set(&self, auth: Answer, profile: Answer) {
        *self.auth.lock().unwrap() = auth;
        *self.profile.lock().unwrap() = profile;
    }

    fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

impl SessionChecks for FakeChecks {
    async fn auth_check(&self, _ctx: &CallContext) -> Result<bool> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        let answer = *self.auth.lock().unwrap();
        answer.to_result()
    }

    async fn profile_status(&self, _ctx: &CallContext) -> Result<bool> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if !self.profile_delay.is_zero() {
            tokio::time::sleep(self.profile_delay).await;
        }
        let answer = *self.profile.lock().unwrap();
        answer.to_result()
    }
}

fn visitor() -> CallContext {
    CallContext::new(Some("token=abc".into()))
}

fn context(checks: FakeChecks, ttl_secs: u64) -> SessionContext<FakeChecks> {
    SessionContext::new(
        checks,
        "token",
        &SessionConfig {
            cache_ttl_secs: ttl_secs,
            max_entries: 2,
        },
    )
}

#[tokio::test]
async fn test_unauthenticated_redirects_to_login_without_profile_check() {
    for profile in [Answer::Yes, Answer::No, Answer::Fail] {
        let checks = FakeChecks::new(Answer::No, profile).with_profile_delay(Duration::from_millis(20));
        let gate = SessionGate::new(&checks);
        let state = gate.evaluate(&visitor(), Requirement::Profile).await;
        assert_eq!(state, GateState::Redirecting(RedirectTarget::Login));
        assert_eq!(checks.profile_calls(), 0);
    }
}

#[tokio::test]
async fn test_authenticated_without_profile_redirects_to_create() {
    let checks = FakeChecks::new(Answer::Yes, Answer::No);
    let gate = SessionGate::new(&checks);
    let state = gate.evaluate(&visitor(), Requirement::Profile).await;
    assert_eq!(state, GateState::Redirecting(RedirectTarget::CreateProfile));
    assert_eq!(checks.auth_calls(), 1);
    assert_eq!(checks.profile_calls(), 1);
}

#[tokio::test]
async fn test_complete_session_allowed() {
    let checks = FakeChecks::new(Answer::Yes, Answer::Yes).with_profile_delay(Duration::from_millis(10));
    let gate = SessionGate::new(&checks);
    let state = gate.evaluate(&visitor(), Requirement::Profile).await;
    assert_eq!(state, GateState::Allowed(Session::complete()));
}

#[tokio::test]
async fn test_failures_fail_closed() {
    let checks = FakeChecks::new(Answer::Fail, Answer::Yes);
    let gate = SessionGate::new(&checks);
    assert!(!gate.check_authenticated(&visitor()).await);
    assert_eq!(
        gate.evaluate(&visitor(), Requirement::Profile).await,
        GateState::Redirecting(RedirectTarget::Login)
    );

    let checks = FakeChecks::new(Answer::Yes, Answer::Fail);
    let gate = SessionGate::new(&checks);
    assert!(!gate.check_has_profile(&visitor()).await);
    let verdict = gate.inspect(&visitor()).await;
    assert_eq!(verdict.session, Session::without_profile());
    assert!(!verdict.definitive);
}

#[tokio::test]
async fn test_context_caches_verified_sessions() {
    let ctx = context(FakeChecks::new(Answer::Yes, Answer::Yes), 60);
    assert_eq!(ctx.get_session(&visitor()).await, Session::complete());
    assert_eq!(ctx.get_session(&visitor()).await, Session::complete());
    assert_eq!(ctx.checks().auth_calls(), 1);
    assert_eq!(ctx.cached_len().await, 1);
}

#[tokio::test]
async fn test_context_does_not_cache_failures() {
    let ctx = context(FakeChecks::new(Answer::Fail, Answer::Yes), 60);
    assert_eq!(ctx.get_session(&visitor()).await, Session::anonymous());
    assert_eq!(ctx.cached_len().await, 0);

    ctx.checks().set(Answer::Yes, Answer::Yes);
    assert_eq!(ctx.get_session(&visitor()).await, Session::complete());
    assert_eq!(ctx.checks().auth_calls(), 2);
}

#[tokio::test]
async fn test_context_without_cookie_never_caches() {
    let ctx = context(FakeChecks::new(Answer::No, Answer::No), 60);
    let anonymous = CallContext::default();
    ctx.get_session(&anonymous).await;
    ctx.get_session(&anonymous).await;
    assert_eq!(ctx.checks().auth_calls(), 2);
    assert_eq!(ctx.cached_len().await, 0);
}

#[tokio::test]
async fn test_context_refresh_and_invalidate() {
    let ctx = context(FakeChecks::new(Answer::Yes, Answer::No), 60);
    assert_eq!(
        ctx.evaluate(&visitor(), Requirement::Profile).await,
        GateState::Redirecting(RedirectTarget::CreateProfile)
    );

    // Profile created: a stale cache would keep redirecting.
    ctx.checks().set(Answer::Yes, Answer::Yes);
    assert_eq!(ctx.get_session(&visitor()).await, Session::without_profile());
    assert_eq!(ctx.refresh(&visitor()).await, Session::complete());
    assert_eq!(ctx.get_session(&visitor()).await, Session::complete());

    ctx.checks().set(Answer::No, Answer::No);
    ctx.invalidate(&visitor()).await;
    assert_eq!(ctx.get_session(&visitor()).await, Session::anonymous());
}

#[tokio::test]
async fn test_context_zero_ttl_disables_cache() {
    let ctx = context(FakeChecks::new(Answer::Yes, Answer::Yes), 0);
    ctx.get_session(&visitor()).await;
    ctx.get_session(&visitor()).await;
    assert_eq!(ctx.checks().auth_calls(), 2);
    assert_eq!(ctx.cached_len().await, 0);
}

#[tokio::test]
async fn test_context_bounded() {
    let ctx = context(FakeChecks::new(Answer::Yes, Answer::Yes), 60);
    for token in ["a", "b", "c"] {
        ctx.get_session(&CallContext::new(Some(format!("token={token}"))))
            .await;
    }
    assert_eq!(ctx.cached_len().await, 2);
}
