//! Role guard for HTML routes
//!
//! [`evaluate`] decides what to do with a request to a guarded route from the
//! session and the presence of an `auth_token` cookie. The one decision that
//! needs I/O, [`GuardDecision::VerifyCookie`], is completed by the caller with
//! [`resolve_cookie_check`] once the backend has been asked.

use crate::session::{Role, Session};

pub const LOGIN_URL: &str = "/login";
pub const BACKEND_UNAVAILABLE: &str = "backend_unavailable";

/// Roles allowed on a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRule {
    pub roles: &'static [Role],
}

impl AccessRule {
    pub const SUPER_ADMIN: AccessRule = AccessRule {
        roles: &[Role::SuperAdmin],
    };
    pub const EMPRESA: AccessRule = AccessRule {
        roles: &[Role::Empresa],
    };
    pub const ANY_ROLE: AccessRule = AccessRule { roles: &Role::ALL };

    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// No session, but an auth cookie: ask the backend whether it is still good
    VerifyCookie,
    RedirectLogin,
    /// The session holds a role outside the known set
    ClearAndRedirectLogin,
    /// Known role, but not allowed here
    RedirectHome(Role),
}

/// Outcome of a [`GuardDecision::VerifyCookie`] check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieCheck {
    /// Let the request through; the backend authorizes every call it makes
    AllowDelegated,
    RedirectLogin,
}

pub fn evaluate(session: Option<&Session>, has_auth_cookie: bool, rule: &AccessRule) -> GuardDecision {
    let user = session.and_then(|s| s.user.as_ref());

    match user {
        None if has_auth_cookie => GuardDecision::VerifyCookie,
        None => GuardDecision::RedirectLogin,
        Some(user) => match user.role() {
            Err(e) => {
                tracing::warn!("Session for {} rejected: {}", user.username, e);
                GuardDecision::ClearAndRedirectLogin
            }
            Ok(role) if rule.allows(role) => GuardDecision::Allow,
            Ok(role) => {
                tracing::debug!("Role {} not allowed, redirecting to {}", role, role.home_path());
                GuardDecision::RedirectHome(role)
            }
        },
    }
}

pub fn resolve_cookie_check(valid: bool) -> CookieCheck {
    if valid {
        CookieCheck::AllowDelegated
    } else {
        CookieCheck::RedirectLogin
    }
}

pub fn login_url() -> String {
    LOGIN_URL.to_string()
}

pub fn login_url_with_error(error: &str) -> String {
    format!("{LOGIN_URL}?error={}", urlencoding::encode(error))
}
