use std::sync::Arc;
use std::time::Duration;

use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue};
use http::StatusCode;
use serde_json::json;
use tokio::sync::Mutex;

use super::errors::ApiClientError;
use super::types::{ApiRequest, ApiResponse, CookieJar, RefreshFailure, RefreshOutcome};
use crate::config::{
    AUTH_TOKEN_COOKIE, HEALTH_PATH, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REFRESH_TOKEN_COOKIE,
};
use crate::utils::{SetCookie, set_cookies_from_headers};

/// Shared HTTP client for every request-scoped [`ApiClient`]
///
/// Uses the configured timeout for every backend call, including refreshes.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ApiClientError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(32)
        .build()?)
}

/// Backend API client scoped to a single inbound request
///
/// Carries the auth cookies the browser sent plus any cookies the backend
/// issued while this request was being handled. Clones share that state, so
/// middleware and handlers of the same request see the same cache. A new
/// client must be created for every inbound request.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    inbound: CookieJar,
    state: Mutex<ClientState>,
}

#[derive(Default)]
struct ClientState {
    /// Cookies issued by the backend during this request
    cached: Option<CookieJar>,
    /// Cookies waiting to be written onto the browser response
    pending: Vec<SetCookie>,
}

/// Steps of one call through the retry protocol
enum Phase {
    Direct,
    Refreshing(ApiResponse),
    Retried,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field(
                "inbound",
                &self.inner.inbound.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ApiClient {
    pub fn new<I, K, V>(http: reqwest::Client, base_url: &str, inbound_cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                inbound: inbound_cookies.into_iter().collect(),
                state: Mutex::new(ClientState::default()),
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Every cookie the browser sent with the inbound request
    pub fn inbound_cookies(&self) -> Vec<(String, String)> {
        self.inner
            .inbound
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn inbound_cookie(&self, name: &str) -> Option<&str> {
        self.inner.inbound.token(name)
    }

    /// Cookies issued by the backend so far in this request
    pub async fn cached_cookies(&self) -> Option<CookieJar> {
        self.inner.state.lock().await.cached.clone()
    }

    /// Drain the cookies that must be propagated to the browser
    ///
    /// One entry per cookie name; the most recently issued value wins.
    pub async fn take_refreshed_cookies(&self) -> Vec<SetCookie> {
        std::mem::take(&mut self.inner.state.lock().await.pending)
    }

    /// Send a request to the backend, refreshing the access token once on 401
    ///
    /// Network errors of the primary call are returned as errors. Failures of
    /// the refresh call are never surfaced: the original 401 response is
    /// returned instead.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiClientError> {
        let path = normalize_path(&request.path);
        let mut jar = self.resolve_cookies(request.cookies.as_deref()).await;
        let mut phase = Phase::Direct;

        loop {
            phase = match phase {
                Phase::Direct => {
                    let response = self.send(&request, &path, &jar, false).await?;
                    if !needs_refresh(&path, &response, &jar) {
                        return Ok(response);
                    }
                    tracing::debug!("Access token rejected, attempting refresh");
                    Phase::Refreshing(response)
                }
                Phase::Refreshing(original) => match self.refresh(&jar).await {
                    RefreshOutcome::Refreshed(issued) => {
                        tracing::debug!("Token refreshed, retrying {} {}", request.method, path);
                        jar = self.remember_issued(issued, jar).await;
                        Phase::Retried
                    }
                    RefreshOutcome::Failed(reason) => {
                        tracing::warn!("Token refresh failed: {:?}", reason);
                        self.inner.state.lock().await.cached = None;
                        return Ok(original);
                    }
                },
                Phase::Retried => {
                    let response = self.send(&request, &path, &jar, true).await?;
                    if response.status == StatusCode::UNAUTHORIZED {
                        tracing::debug!("Still unauthorized after refresh, giving up");
                    }
                    return Ok(response);
                }
            };
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiClientError> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ApiClientError> {
        self.request(ApiRequest::post(path).json(body)).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ApiClientError> {
        self.request(ApiRequest::put(path).json(body)).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<ApiResponse, ApiClientError> {
        self.request(ApiRequest::patch(path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiClientError> {
        self.request(ApiRequest::delete(path)).await
    }

    /// `true` when the backend answers `/health` with a success status
    pub async fn health_check(&self) -> bool {
        match self.get(HEALTH_PATH).await {
            Ok(response) => {
                if !response.is_success() {
                    tracing::warn!("Backend health check returned {}", response.status);
                }
                response.is_success()
            }
            Err(e) => {
                tracing::warn!("Backend health check failed: {}", e);
                false
            }
        }
    }

    /// Log in against the backend
    ///
    /// On success the cookies issued by the backend are cached for the rest of
    /// this request and queued for the browser response.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, usuario: &str, password: &str) -> Result<ApiResponse, ApiClientError> {
        let response = self
            .request(ApiRequest::post(LOGIN_PATH).json(json!({
                "usuario": usuario,
                "password": password,
            })))
            .await?;

        if response.is_success() {
            let issued = response.set_cookies();
            tracing::debug!(
                "Login issued cookies: {:?}",
                issued.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
            );
            self.remember_issued(issued, CookieJar::default()).await;
        }
        Ok(response)
    }

    /// Best-effort logout against the backend
    pub async fn logout(&self) -> bool {
        let result = self.request(ApiRequest::post(LOGOUT_PATH)).await;
        self.inner.state.lock().await.cached = None;
        match result {
            Ok(response) => response.is_success(),
            Err(e) => {
                tracing::warn!("Backend logout failed: {}", e);
                false
            }
        }
    }

    /// Explicit cookies > cookies issued during this request > inbound cookies
    async fn resolve_cookies(&self, explicit: Option<&[(String, String)]>) -> CookieJar {
        let mut jar = CookieJar::default();
        for name in [AUTH_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
            if let Some(value) = self.inner.inbound.get(name) {
                jar.insert(name, value);
            }
        }

        if let Some(cached) = &self.inner.state.lock().await.cached {
            jar.merge(cached);
        }

        if let Some(explicit) = explicit {
            for (name, value) in explicit {
                jar.insert(name.as_str(), value.as_str());
            }
        }
        jar
    }

    /// Merge cookies issued by the backend into the cache and the browser queue
    async fn remember_issued(&self, issued: Vec<SetCookie>, mut jar: CookieJar) -> CookieJar {
        let mut state = self.inner.state.lock().await;
        let cached = state.cached.get_or_insert_with(CookieJar::default);
        for cookie in &issued {
            cached.insert(cookie.name.as_str(), cookie.value.as_str());
            jar.insert(cookie.name.as_str(), cookie.value.as_str());
        }
        for cookie in issued {
            state.pending.retain(|c| c.name != cookie.name);
            state.pending.push(cookie);
        }
        jar
    }

    async fn refresh(&self, jar: &CookieJar) -> RefreshOutcome {
        let url = format!("{}{}", self.inner.base_url, REFRESH_PATH);
        let mut builder = self
            .inner
            .http
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match jar.to_header_value() {
            Ok(cookie) => builder = builder.header(COOKIE, cookie),
            Err(e) => return RefreshOutcome::Failed(RefreshFailure::Transport(e.to_string())),
        }

        match builder.send().await {
            Ok(response) if response.status().is_success() => {
                RefreshOutcome::Refreshed(set_cookies_from_headers(response.headers()))
            }
            Ok(response) => RefreshOutcome::Failed(RefreshFailure::Status(response.status())),
            Err(e) => RefreshOutcome::Failed(RefreshFailure::Transport(e.to_string())),
        }
    }

    async fn send(
        &self,
        request: &ApiRequest,
        path: &str,
        jar: &CookieJar,
        retry: bool,
    ) -> Result<ApiResponse, ApiClientError> {
        let url = self.url_for(path, request.query.as_deref())?;
        let headers = outbound_headers(&request.headers, jar, retry)?;

        tracing::debug!(
            "{} {} cookies={:?}",
            request.method,
            url,
            jar.iter().map(|(k, _)| k).collect::<Vec<_>>()
        );

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .headers(headers);
        if let Some(body) = &request.json {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        ApiResponse::from_reqwest(response).await
    }

    fn url_for(&self, path: &str, query: Option<&str>) -> Result<url::Url, ApiClientError> {
        let raw = match query {
            Some(query) => format!("{}{}?{}", self.inner.base_url, path, query),
            None => format!("{}{}", self.inner.base_url, path),
        };
        url::Url::parse(&raw).map_err(|e| ApiClientError::InvalidUrl(format!("{raw}: {e}")))
    }
}

fn needs_refresh(path: &str, response: &ApiResponse, jar: &CookieJar) -> bool {
    response.status == StatusCode::UNAUTHORIZED
        && !is_auth_endpoint(path)
        && jar.token(REFRESH_TOKEN_COOKIE).is_some()
}

/// Endpoints whose 401 must never trigger a refresh
fn is_auth_endpoint(path: &str) -> bool {
    path == LOGIN_PATH || path == REFRESH_PATH
}

pub(crate) fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Caller headers plus the JSON content type and bearer token defaults
///
/// On a retry the bearer header is rebuilt from the refreshed access token.
fn outbound_headers(
    caller: &HeaderMap,
    jar: &CookieJar,
    retry: bool,
) -> Result<HeaderMap, ApiClientError> {
    let mut headers = caller.clone();
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    if let Some(token) = jar.token(AUTH_TOKEN_COOKIE) {
        if retry || !headers.contains_key(AUTHORIZATION) {
            let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiClientError::Header(e.to_string()))?;
            headers.insert(AUTHORIZATION, bearer);
        }
    }

    headers.remove(COOKIE);
    if !jar.is_empty() {
        headers.insert(COOKIE, jar.to_header_value()?);
    }
    Ok(headers)
}
