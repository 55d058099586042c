use serde::{Deserialize, Serialize};

pub const LOGIN_PATH: &str = "/login";
pub const CREATE_PROFILE_PATH: &str = "/createprofile";
pub const PROFILE_PATH: &str = "/profile";

/// What the backend currently says about the visitor. Always derived from
/// a server check, never trusted from the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    pub has_profile: bool,
}

impl Session {
    pub const fn anonymous() -> Self {
        Self {
            authenticated: false,
            has_profile: false,
        }
    }

    pub const fn without_profile() -> Self {
        Self {
            authenticated: true,
            has_profile: false,
        }
    }

    pub const fn complete() -> Self {
        Self {
            authenticated: true,
            has_profile: true,
        }
    }

    /// Apply a page's requirement to this session.
    pub fn admit(&self, requirement: Requirement) -> Access {
        match requirement {
            Requirement::Profile => {
                if !self.authenticated {
                    Access::Redirect(RedirectTarget::Login)
                } else if !self.has_profile {
                    Access::Redirect(RedirectTarget::CreateProfile)
                } else {
                    Access::Allow
                }
            }
            Requirement::Authenticated => {
                if !self.authenticated {
                    Access::Redirect(RedirectTarget::Login)
                } else if self.has_profile {
                    Access::Redirect(RedirectTarget::Profile)
                } else {
                    Access::Allow
                }
            }
            Requirement::Guest => {
                if !self.authenticated {
                    Access::Allow
                } else if self.has_profile {
                    Access::Redirect(RedirectTarget::Profile)
                } else {
                    Access::Redirect(RedirectTarget::CreateProfile)
                }
            }
        }
    }
}

/// What a page needs before it may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Signed in with a profile. Every content page.
    Profile,
    /// Signed in, profile not yet created. The profile-creation page.
    Authenticated,
    /// Signed out. Login and registration.
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Login,
    CreateProfile,
    Profile,
}

impl RedirectTarget {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => LOGIN_PATH,
            Self::CreateProfile => CREATE_PROFILE_PATH,
            Self::Profile => PROFILE_PATH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(RedirectTarget),
}

/// Lifecycle of the gate for one page mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Allowed(Session),
    Redirecting(RedirectTarget),
}
