//! ecoes-bff - Core of the backend-for-frontend web server
//!
//! This crate holds everything that does not depend on the web framework:
//! settings, the request-scoped backend API client with its refresh-and-retry
//! protocol, the signed session cookie, the role guard and the generic proxy
//! planning.

mod client;
mod config;
mod guard;
mod proxy;
mod session;
mod utils;

pub use client::{
    ApiClient, ApiClientError, ApiRequest, ApiResponse, CookieJar, RefreshFailure,
    RefreshOutcome, build_http_client,
};

pub use config::{
    AUTH_TOKEN_COOKIE, ConfigError, ContactConfig, CookieAttributes, HEALTH_PATH, LOGIN_PATH,
    LOGOUT_PATH, PUBLIC_PROXY_ENDPOINTS, REFRESH_PATH, REFRESH_TOKEN_COOKIE, Settings,
    parse_bool_flag, parse_origins,
};

pub use guard::{
    AccessRule, BACKEND_UNAVAILABLE, CookieCheck, GuardDecision, LOGIN_URL, evaluate, login_url,
    login_url_with_error, resolve_cookie_check,
};

pub use proxy::{
    PROXY_UNAUTHENTICATED_MESSAGE, PROXY_UPSTREAM_ERROR_MESSAGE, ProxiedResponse, ProxyError,
    is_public_endpoint, parse_json_body, plan_request, rewrite_response,
};

pub use session::{
    Role, Session, SessionError, SessionUser, UserId, decode_session, encode_session,
    prepare_clear_session_headers, prepare_session_headers, session_from_headers,
};

pub use utils::{
    SetCookie, UtilError, cookies_from_headers, format_backend_cookie, format_expired_cookie,
    format_set_cookie, header_expire_cookie, header_set_backend_cookie, header_set_cookie,
    parse_cookie_header, parse_set_cookie,
};
