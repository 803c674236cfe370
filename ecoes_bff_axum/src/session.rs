use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Redirect, Response},
};
use http::{Method, request::Parts};

use ecoes_bff::{Role, Session, SessionUser, login_url, session_from_headers};

use crate::error::{AppError, ErrorFormat};
use crate::state::AppState;

/// Rejection of [`CurrentSession`]: login redirect for page loads, 401 otherwise
pub struct AuthRedirect {
    method: Method,
    format: ErrorFormat,
}

impl AuthRedirect {
    fn new(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            format: ErrorFormat::from_headers(&parts.headers),
        }
    }

    fn into_response_with_method(self) -> Response {
        if self.method == Method::GET && self.format == ErrorFormat::Html {
            tracing::debug!("Redirecting to {}", login_url());
            Redirect::to(&login_url()).into_response()
        } else {
            AppError::Unauthorized
                .with_format(self.format)
                .into_response()
        }
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        self.into_response_with_method()
    }
}

/// Session decoded from the signed session cookie
///
/// Used as an extractor: `CurrentSession` rejects requests without a valid
/// session, `Option<CurrentSession>` never rejects. Sessions whose role is
/// outside the known set are still returned; role checks belong to the guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentSession(pub Session);

impl CurrentSession {
    pub fn user(&self) -> Option<&SessionUser> {
        self.0.user.as_ref()
    }

    /// Role of the session user, `None` when absent or unknown
    pub fn role(&self) -> Option<Role> {
        self.user().and_then(|u| u.role().ok())
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Set by the role guard when it already decoded the cookie
        if let Some(session) = parts.extensions.get::<CurrentSession>() {
            return Ok(session.clone());
        }

        let state = AppState::from_ref(state);
        match session_from_headers(&parts.headers, &state.settings) {
            Some(session) if session.user.is_some() => Ok(CurrentSession(session)),
            _ => {
                tracing::debug!("No valid session cookie");
                Err(AuthRedirect::new(parts))
            }
        }
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let result: Result<Self, Self::Rejection> =
            <CurrentSession as FromRequestParts<S>>::from_request_parts(parts, state).await;
        Ok(result.ok())
    }
}
