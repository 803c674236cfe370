//! Generic backend proxy
//!
//! `ANY {PROXY_PREFIX}/{*endpoint}` is forwarded to `{BACKEND_API_URL}/{endpoint}`
//! through the request-scoped [`ApiClient`].

use axum::{
    Extension, Json, Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use ecoes_bff::{
    ApiClient, PROXY_UNAUTHENTICATED_MESSAGE, PROXY_UPSTREAM_ERROR_MESSAGE, ProxyError,
    plan_request, rewrite_response,
};

use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route(
        "/{*endpoint}",
        get(proxy).post(proxy).put(proxy).delete(proxy).patch(proxy),
    )
}

fn proxy_error_response(err: ProxyError) -> Response {
    match err {
        ProxyError::Unauthenticated(path) => {
            tracing::debug!("Proxy call to {} without auth cookie", path);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": PROXY_UNAUTHENTICATED_MESSAGE })),
            )
                .into_response()
        }
        other => {
            tracing::error!("Proxy error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": PROXY_UPSTREAM_ERROR_MESSAGE })),
            )
                .into_response()
        }
    }
}

async fn proxy(
    State(state): State<AppState>,
    Extension(client): Extension<ApiClient>,
    Path(endpoint): Path<String>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    tracing::debug!("Proxy {} /{}", method, endpoint);
    match forward(&state, &client, method, &endpoint, uri.query(), &body).await {
        Ok(response) => response,
        Err(err) => proxy_error_response(err),
    }
}

async fn forward(
    state: &AppState,
    client: &ApiClient,
    method: Method,
    endpoint: &str,
    query: Option<&str>,
    body: &[u8],
) -> Result<Response, ProxyError> {
    let request = plan_request(method, endpoint, query, body, client.inbound_cookies())?;
    let backend_response = client.request(request).await?;
    let proxied = rewrite_response(backend_response, state.settings.cookie_attributes())?;

    let mut response = Response::new(Body::from(proxied.body));
    *response.status_mut() = proxied.status;
    *response.headers_mut() = proxied.headers;
    Ok(response)
}
