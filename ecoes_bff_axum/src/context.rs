//! Per-request backend client
//!
//! [`request_context`] creates the [`ApiClient`] for the inbound request,
//! exposes it to handlers as `Extension<ApiClient>`, and once the handler is
//! done writes every cookie the backend issued meanwhile onto the response.

use std::collections::HashSet;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::header::SET_COOKIE;

use ecoes_bff::{
    ApiClient, CookieAttributes, cookies_from_headers, header_set_backend_cookie, parse_set_cookie,
};

use crate::state::AppState;

pub async fn request_context(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let inbound = cookies_from_headers(req.headers());
    let client = ApiClient::new(state.http.clone(), &state.settings.backend_api_url, inbound);
    req.extensions_mut().insert(client.clone());

    let mut response = next.run(req).await;
    flush_refreshed_cookies(&client, &mut response, state.settings.cookie_attributes()).await;
    response
}

/// Append the queued backend cookies unless the response already sets that name
async fn flush_refreshed_cookies(client: &ApiClient, response: &mut Response, attrs: CookieAttributes) {
    let refreshed = client.take_refreshed_cookies().await;
    if refreshed.is_empty() {
        return;
    }

    let already_set: HashSet<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(parse_set_cookie)
        .map(|c| c.name)
        .collect();

    for cookie in refreshed {
        if already_set.contains(&cookie.name) {
            tracing::debug!("Response already sets {}, not overriding", cookie.name);
            continue;
        }
        if let Err(e) = header_set_backend_cookie(response.headers_mut(), &cookie, attrs) {
            tracing::error!("Failed to propagate cookie {}: {}", cookie.name, e);
        } else {
            tracing::debug!("Propagated refreshed cookie {} to the browser", cookie.name);
        }
    }
}
