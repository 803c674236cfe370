use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use ecoes_bff::{
    AUTH_TOKEN_COOKIE, AccessRule, ApiClient, BACKEND_UNAVAILABLE, CookieCheck, GuardDecision,
    PROXY_UNAUTHENTICATED_MESSAGE, evaluate, login_url, login_url_with_error,
    prepare_clear_session_headers, resolve_cookie_check, session_from_headers,
};

use crate::error::{AppError, ErrorFormat};
use crate::session::CurrentSession;
use crate::state::AppState;

fn request_client(req: &Request) -> Result<ApiClient, AppError> {
    req.extensions().get::<ApiClient>().cloned().ok_or_else(|| {
        AppError::Internal("request_context layer missing, no ApiClient on request".to_string())
    })
}

// Login redirect for pages, 401 JSON for API-style requests
fn unauthenticated(format: ErrorFormat) -> Response {
    match format {
        ErrorFormat::Json => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": PROXY_UNAUTHENTICATED_MESSAGE })),
        )
            .into_response(),
        ErrorFormat::Html => Redirect::to(&login_url()).into_response(),
    }
}

fn clear_session_then(state: &AppState, response: Response) -> Response {
    match prepare_clear_session_headers(&state.settings) {
        Ok(headers) => (headers, response).into_response(),
        Err(e) => {
            tracing::error!("Failed to build session clearing headers: {}", e);
            response
        }
    }
}

/// Refuse to render pages that call the backend while the backend is down
///
/// On a failed health check the session is cleared and the browser is sent
/// to the login page with the `backend_unavailable` flag.
pub async fn backend_precheck(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let format = ErrorFormat::from_headers(req.headers());
    let client = match request_client(&req) {
        Ok(client) => client,
        Err(e) => return e.with_format(format).into_response(),
    };

    if client.health_check().await {
        return next.run(req).await;
    }

    tracing::warn!("Backend unavailable, clearing session before {}", req.uri().path());
    clear_session_then(
        &state,
        Redirect::to(&login_url_with_error(BACKEND_UNAVAILABLE)).into_response(),
    )
}

/// Role guard for a route
///
/// Use through [`axum::middleware::from_fn_with_state`] with a closure
/// capturing the route's [`AccessRule`].
pub async fn require_roles(
    State(state): State<AppState>,
    rule: AccessRule,
    mut req: Request,
    next: Next,
) -> Response {
    let format = ErrorFormat::from_headers(req.headers());
    let client = match request_client(&req) {
        Ok(client) => client,
        Err(e) => return e.with_format(format).into_response(),
    };

    let session = session_from_headers(req.headers(), &state.settings);
    let has_auth_cookie = client.inbound_cookie(AUTH_TOKEN_COOKIE).is_some();

    match evaluate(session.as_ref(), has_auth_cookie, &rule) {
        GuardDecision::Allow => {
            if let Some(session) = session {
                req.extensions_mut().insert(CurrentSession(session));
            }
            next.run(req).await
        }
        GuardDecision::VerifyCookie => {
            match resolve_cookie_check(client.health_check().await) {
                CookieCheck::AllowDelegated => {
                    tracing::debug!(
                        "No session but auth cookie accepted, delegating authorization for {}",
                        req.uri().path()
                    );
                    next.run(req).await
                }
                CookieCheck::RedirectLogin => unauthenticated(format),
            }
        }
        GuardDecision::RedirectLogin => unauthenticated(format),
        GuardDecision::ClearAndRedirectLogin => clear_session_then(&state, unauthenticated(format)),
        GuardDecision::RedirectHome(role) => Redirect::to(role.home_path()).into_response(),
    }
}
