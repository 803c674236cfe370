use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, HeaderMap, HeaderName, SET_COOKIE, TRANSFER_ENCODING};
use http::{Method, StatusCode};

use super::errors::ProxyError;
use crate::client::{ApiRequest, ApiResponse, normalize_path};
use crate::config::{AUTH_TOKEN_COOKIE, CookieAttributes, PUBLIC_PROXY_ENDPOINTS};
use crate::utils::header_set_backend_cookie;

pub const PROXY_UNAUTHENTICATED_MESSAGE: &str = "No autenticado";
pub const PROXY_UPSTREAM_ERROR_MESSAGE: &str = "Error de conexión con el backend";

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Response to hand back to the browser
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Endpoints reachable without an auth cookie. A leading `/` is ignored.
pub fn is_public_endpoint(endpoint: &str) -> bool {
    PUBLIC_PROXY_ENDPOINTS.contains(&endpoint.trim_start_matches('/'))
}

/// JSON body of a browser request; empty or invalid bodies yield `None`
pub fn parse_json_body(body: &[u8]) -> Option<serde_json::Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Proxy body is not JSON, forwarding without body: {}", e);
            None
        }
    }
}

/// Build the backend request for `{method} {prefix}/{endpoint}`
///
/// Rejects non-public endpoints when the browser sent no `auth_token` cookie.
/// All inbound cookies are forwarded as explicit cookies.
pub fn plan_request(
    method: Method,
    endpoint: &str,
    query: Option<&str>,
    body: &[u8],
    inbound_cookies: Vec<(String, String)>,
) -> Result<ApiRequest, ProxyError> {
    let has_auth_cookie = inbound_cookies
        .iter()
        .any(|(name, value)| name == AUTH_TOKEN_COOKIE && !value.is_empty());
    if !is_public_endpoint(endpoint) && !has_auth_cookie {
        return Err(ProxyError::Unauthenticated(normalize_path(endpoint)));
    }

    let mut request = ApiRequest::new(method, normalize_path(endpoint))
        .maybe_json(parse_json_body(body))
        .cookies(inbound_cookies);
    if let Some(query) = query {
        request = request.raw_query(query);
    }
    Ok(request)
}

/// Turn a backend response into the browser response
///
/// Without `Set-Cookie` the response passes through. Otherwise the backend
/// cookies are re-set on the browser with this service's cookie attributes,
/// values copied verbatim.
pub fn rewrite_response(
    response: ApiResponse,
    attrs: CookieAttributes,
) -> Result<ProxiedResponse, ProxyError> {
    let cookies = response.set_cookies();
    let mut headers = response.headers;
    for name in [CONNECTION, TRANSFER_ENCODING, KEEP_ALIVE] {
        headers.remove(name);
    }

    if !cookies.is_empty() {
        headers.remove(SET_COOKIE);
        headers.remove(CONTENT_LENGTH);
        for cookie in &cookies {
            header_set_backend_cookie(&mut headers, cookie, attrs)?;
        }
        tracing::debug!(
            "Re-set backend cookies on browser: {:?}",
            cookies.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );
    }

    Ok(ProxiedResponse {
        status: response.status,
        headers,
        body: response.body,
    })
}
