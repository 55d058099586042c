use crate::api::{CallContext, SessionChecks};
use crate::model::{Access, GateState, Requirement, Session};

/// Outcome of running both checks once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub session: Session,
    /// False when a check failed and the session was assumed fail-closed.
    pub definitive: bool,
}

/// Decides, per page mount, between rendering and redirecting.
///
/// The checks run sequentially and short-circuit: the profile check is never
/// issued for a visitor the backend does not recognise. Any failure counts as
/// "not satisfied".
pub struct SessionGate<'a, P> {
    checks: &'a P,
}

impl<'a, P: SessionChecks> SessionGate<'a, P> {
    pub fn new(checks: &'a P) -> Self {
        Self { checks }
    }

    pub async fn check_authenticated(&self, ctx: &CallContext) -> bool {
        match self.checks.auth_check(ctx).await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                tracing::warn!(error = %e, "auth check failed, treating visitor as signed out");
                false
            }
        }
    }

    pub async fn check_has_profile(&self, ctx: &CallContext) -> bool {
        match self.checks.profile_status(ctx).await {
            Ok(has_profile) => has_profile,
            Err(e) => {
                tracing::warn!(error = %e, "profile check failed, treating profile as missing");
                false
            }
        }
    }

    pub async fn inspect(&self, ctx: &CallContext) -> Verdict {
        let authenticated = match self.checks.auth_check(ctx).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "auth check failed, treating visitor as signed out");
                return Verdict {
                    session: Session::anonymous(),
                    definitive: false,
                };
            }
        };
        if !authenticated {
            return Verdict {
                session: Session::anonymous(),
                definitive: true,
            };
        }
        match self.checks.profile_status(ctx).await {
            Ok(has_profile) => Verdict {
                session: Session {
                    authenticated: true,
                    has_profile,
                },
                definitive: true,
            },
            Err(e) => {
                tracing::warn!(error = %e, "profile check failed, treating profile as missing");
                Verdict {
                    session: Session::without_profile(),
                    definitive: false,
                }
            }
        }
    }

    pub async fn resolve(&self, ctx: &CallContext) -> Session {
        self.inspect(ctx).await.session
    }

    /// Run the gate for a page with the given requirement.
    pub async fn evaluate(&self, ctx: &CallContext, requirement: Requirement) -> GateState {
        settle(self.resolve(ctx).await, requirement)
    }
}

pub(crate) fn settle(session: Session, requirement: Requirement) -> GateState {
    match session.admit(requirement) {
        Access::Allow => GateState::Allowed(session),
        Access::Redirect(target) => GateState::Redirecting(target),
    }
}
