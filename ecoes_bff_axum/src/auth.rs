//! Login, session and logout endpoints

use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use ecoes_bff::{
    AUTH_TOKEN_COOKIE, ApiClient, ApiResponse, PROXY_UNAUTHENTICATED_MESSAGE,
    PROXY_UPSTREAM_ERROR_MESSAGE, REFRESH_TOKEN_COOKIE, Role, Session, SessionUser,
    header_expire_cookie, login_url, prepare_clear_session_headers, prepare_session_headers,
};

use crate::error::{AppError, ErrorFormat, IntoAppError};
use crate::session::CurrentSession;
use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/sync-session", post(sync_session))
        .route("/api/public-config", get(public_config))
        .route("/api/session", get(session_info))
        .route("/logout", get(logout).post(logout))
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    usuario: String,
    password: String,
}

#[derive(Deserialize)]
pub(crate) struct SyncSessionRequest {
    user: SessionUser,
    permanent: Option<bool>,
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Relay a failed backend response with its status and body
fn relay(response: ApiResponse) -> Response {
    let mut relayed = Response::new(Body::from(response.body));
    *relayed.status_mut() = response.status;
    if let Some(content_type) = response.headers.get(CONTENT_TYPE) {
        relayed
            .headers_mut()
            .insert(CONTENT_TYPE, content_type.clone());
    }
    relayed
}

/// User object of a backend login answer, under `user` or `data`
fn user_from_login_body(body: &Value) -> Option<SessionUser> {
    ["user", "data"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|value| serde_json::from_value(value.clone()).ok())
}

/// Store `user` in a fresh session and answer with its home page
fn start_session(
    state: &AppState,
    user: SessionUser,
    role: Role,
    permanent: bool,
) -> Result<(HeaderMap, Json<Value>), AppError> {
    let session = Session::new(user.clone(), permanent, state.settings.session_lifetime);
    let headers = prepare_session_headers(&session, &state.settings).into_app_error()?;
    tracing::info!("Session started for {} ({})", user.username, role);
    Ok((
        headers,
        Json(json!({
            "success": true,
            "user": user,
            "redirect": role.home_path(),
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Extension(client): Extension<ApiClient>,
    format: ErrorFormat,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(credentials) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!("Invalid login payload: {}", e);
            return json_error(StatusCode::BAD_REQUEST, "Usuario y contraseña son requeridos");
        }
    };

    let response = match client.login(&credentials.usuario, &credentials.password).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Login request to backend failed: {}", e);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, PROXY_UPSTREAM_ERROR_MESSAGE);
        }
    };
    if !response.is_success() {
        tracing::info!("Backend rejected login for {}: {}", credentials.usuario, response.status);
        return relay(response);
    }

    let user = match response.json::<Value>().ok().as_ref().and_then(user_from_login_body) {
        Some(user) => user,
        None => {
            return AppError::Internal("login answer without a usable user".to_string())
                .with_format(format)
                .into_response();
        }
    };
    let role = match user.role() {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!("Login of {} refused: {}", user.username, e);
            return json_error(StatusCode::FORBIDDEN, "Rol de usuario no permitido");
        }
    };

    match start_session(&state, user, role, true) {
        Ok(response) => response.into_response(),
        Err(e) => e.with_format(format).into_response(),
    }
}

/// Mirror a login performed by the browser directly against the proxy
async fn sync_session(
    State(state): State<AppState>,
    Extension(client): Extension<ApiClient>,
    format: ErrorFormat,
    payload: Result<Json<SyncSessionRequest>, JsonRejection>,
) -> Response {
    if client.inbound_cookie(AUTH_TOKEN_COOKIE).is_none() {
        return json_error(StatusCode::UNAUTHORIZED, PROXY_UNAUTHENTICATED_MESSAGE);
    }
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!("Invalid sync-session payload: {}", e);
            return json_error(StatusCode::BAD_REQUEST, "Datos de usuario inválidos");
        }
    };
    let role = match request.user.role() {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!("Session sync refused: {}", e);
            return json_error(StatusCode::BAD_REQUEST, "Rol de usuario inválido");
        }
    };

    match start_session(&state, request.user, role, request.permanent.unwrap_or(true)) {
        Ok((headers, Json(body))) => {
            let redirect = body["redirect"].clone();
            (headers, Json(json!({ "success": true, "redirect": redirect }))).into_response()
        }
        Err(e) => e.with_format(format).into_response(),
    }
}

async fn public_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.settings.public_config())
}

async fn session_info(session: Option<CurrentSession>) -> impl IntoResponse {
    match session {
        Some(session) if session.role().is_some() => {
            Json(json!({ "authenticated": true, "user": session.user() }))
        }
        _ => Json(json!({ "authenticated": false, "user": null })),
    }
}

/// Best-effort backend logout, then drop the session and both auth cookies
async fn logout(
    State(state): State<AppState>,
    Extension(client): Extension<ApiClient>,
    format: ErrorFormat,
) -> Response {
    if client.inbound_cookie(AUTH_TOKEN_COOKIE).is_some() && !client.logout().await {
        tracing::warn!("Backend logout did not succeed, clearing local session anyway");
    }

    let attrs = state.settings.cookie_attributes();
    let headers = prepare_clear_session_headers(&state.settings)
        .map_err(|e| AppError::Internal(e.to_string()))
        .and_then(|mut headers| {
            for name in [AUTH_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
                header_expire_cookie(&mut headers, name, attrs)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
            }
            Ok(headers)
        });

    match headers {
        Ok(headers) => (headers, Redirect::to(&login_url())).into_response(),
        Err(e) => e.with_format(format).into_response(),
    }
}
