//! Application router

use axum::{Router, middleware::from_fn_with_state};
use http::{HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::context::request_context;
use crate::error::not_found;
use crate::state::AppState;
use crate::{auth, pages, proxy};

/// Build the complete application
///
/// - pages from the page route table
/// - `/api/login`, `/api/sync-session`, `/api/session`, `/api/public-config`, `/logout`
/// - the generic backend proxy under `PROXY_PREFIX`
///
/// Every route runs inside [`request_context`], so handlers can extract the
/// request-scoped `ApiClient`.
pub fn app_router(state: AppState) -> Router {
    app_router_no_trace(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`app_router`] without the HTTP tracing layer
pub fn app_router_no_trace(state: AppState) -> Router {
    let prefix = state.settings.proxy_prefix.clone();
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .merge(pages::router(&state))
        .merge(auth::router())
        .nest(&prefix, proxy::router())
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), request_context))
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

/// CORS with credentials; `*` mirrors the request origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let list: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}
