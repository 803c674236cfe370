//! Scriptable mock of the REST backend
//!
//! Served by axum on an ephemeral port; every call is recorded so tests can
//! assert on what the API client actually sent.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde_json::json;

pub const VALID_USER: &str = "ana";
pub const VALID_PASSWORD: &str = "secret";

/// How `/auth/refresh` answers
#[derive(Debug, Clone)]
pub enum RefreshMode {
    /// 200 with a new `auth_token`, which becomes the accepted token
    Issue(String),
    /// 200 with a new `auth_token` that the backend keeps rejecting
    IssueStillRejected(String),
    /// 401, refresh token rejected
    Reject,
    /// Answer only after this delay, longer than the client timeout
    Hang(Duration),
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub cookie: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

struct Inner {
    calls: Vec<RecordedCall>,
    accepted_token: String,
    refresh_mode: RefreshMode,
    healthy: bool,
}

#[derive(Clone)]
pub struct MockBackend {
    pub base_url: String,
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    /// Start a backend accepting `accepted_token` as access token
    pub async fn start(accepted_token: &str) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            calls: Vec::new(),
            accepted_token: accepted_token.to_string(),
            refresh_mode: RefreshMode::Reject,
            healthy: true,
        }));

        let app = Router::new().fallback(handle).with_state(inner.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}"),
            inner,
        }
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        self.inner.lock().unwrap().refresh_mode = mode;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.inner.lock().unwrap().healthy = healthy;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.calls_to("/auth/refresh").len()
    }
}

fn cookie_value(cookie_header: Option<&str>, name: &str) -> Option<String> {
    cookie_header?.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

fn set_cookie(value: String) -> [(header::HeaderName, String); 1] {
    [(header::SET_COOKIE, value)]
}

async fn handle(
    State(inner): State<Arc<Mutex<Inner>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    };
    let call = RecordedCall {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        cookie: header_str(header::COOKIE),
        authorization: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE),
        body: body.clone(),
    };

    let (accepted, refresh_mode, healthy) = {
        let mut guard = inner.lock().unwrap();
        guard.calls.push(call.clone());
        (
            guard.accepted_token.clone(),
            guard.refresh_mode.clone(),
            guard.healthy,
        )
    };

    match call.path.as_str() {
        "/health" if healthy => (StatusCode::OK, "ok").into_response(),
        "/health" => (StatusCode::SERVICE_UNAVAILABLE, "down").into_response(),

        "/auth/login" => {
            let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
            if body["usuario"] == VALID_USER && body["password"] == VALID_PASSWORD {
                (
                    StatusCode::OK,
                    AppendHeaders([
                        (
                            header::SET_COOKIE,
                            format!("auth_token={accepted}; HttpOnly; Path=/; Max-Age=900"),
                        ),
                        (
                            header::SET_COOKIE,
                            "refresh_token=refresh-1; HttpOnly; Path=/".to_string(),
                        ),
                    ]),
                    axum::Json(json!({
                        "success": true,
                        "user": {"id": 7, "username": VALID_USER, "role": "empresa"}
                    })),
                )
                    .into_response()
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    axum::Json(json!({"error": "Credenciales inválidas"})),
                )
                    .into_response()
            }
        }

        "/auth/refresh" => {
            let has_refresh = cookie_value(call.cookie.as_deref(), "refresh_token")
                .is_some_and(|v| !v.is_empty());
            match refresh_mode {
                _ if !has_refresh => StatusCode::UNAUTHORIZED.into_response(),
                RefreshMode::Issue(token) => {
                    inner.lock().unwrap().accepted_token = token.clone();
                    (
                        StatusCode::OK,
                        set_cookie(format!("auth_token={token}; HttpOnly; Path=/")),
                        axum::Json(json!({"success": true})),
                    )
                        .into_response()
                }
                RefreshMode::IssueStillRejected(token) => (
                    StatusCode::OK,
                    set_cookie(format!("auth_token={token}; HttpOnly; Path=/")),
                    axum::Json(json!({"success": true})),
                )
                    .into_response(),
                RefreshMode::Reject => StatusCode::UNAUTHORIZED.into_response(),
                RefreshMode::Hang(delay) => {
                    tokio::time::sleep(delay).await;
                    StatusCode::OK.into_response()
                }
            }
        }

        "/auth/logout" => (
            StatusCode::OK,
            set_cookie("auth_token=; Max-Age=0; Path=/".to_string()),
            axum::Json(json!({"success": true})),
        )
            .into_response(),

        path => {
            let bearer = call
                .authorization
                .as_deref()
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string);
            let token = bearer.or_else(|| cookie_value(call.cookie.as_deref(), "auth_token"));
            if token.as_deref() != Some(accepted.as_str()) {
                return (
                    StatusCode::UNAUTHORIZED,
                    axum::Json(json!({"error": "Token expirado"})),
                )
                    .into_response();
            }

            let echoed: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
            let payload = json!({
                "path": path,
                "method": method.as_str(),
                "query": call.query,
                "body": echoed,
            });

            if path == "/api/issue-cookie" {
                return (
                    StatusCode::OK,
                    set_cookie("theme=dark; Path=/api; Max-Age=60".to_string()),
                    axum::Json(payload),
                )
                    .into_response();
            }
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
    }
}
