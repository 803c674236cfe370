use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::SessionError;

/// Roles understood by the front-end
///
/// The set is closed: any other value found in a session is treated as a
/// tampered or stale session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Empresa,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Empresa, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Empresa => "empresa",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Dashboard a user of this role lands on
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Empresa => "/empresa",
            Role::SuperAdmin => "/admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empresa" => Ok(Role::Empresa),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(SessionError::InvalidRole(other.to_string())),
        }
    }
}

/// Backend user ids are numeric in practice, but strings are accepted too
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{n}"),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// User as reported by the backend
///
/// `role` is kept as received; it is only interpreted through [`SessionUser::role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub role: String,
}

impl SessionUser {
    pub fn role(&self) -> Result<Role, SessionError> {
        self.role.parse()
    }
}

/// Server-side session carried in the signed session cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<SessionUser>,
    pub permanent: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Permanent sessions expire after `lifetime`; others last until the browser closes
    pub fn new(user: SessionUser, permanent: bool, lifetime: Duration) -> Self {
        let issued_at = Utc::now();
        let expires_at = permanent.then(|| {
            issued_at
                + chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::zero())
        });
        Self {
            user: Some(user),
            permanent,
            issued_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
