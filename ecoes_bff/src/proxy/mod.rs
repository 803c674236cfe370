mod core;
mod errors;

pub use core::{
    PROXY_UNAUTHENTICATED_MESSAGE, PROXY_UPSTREAM_ERROR_MESSAGE, ProxiedResponse,
    is_public_endpoint, parse_json_body, plan_request, rewrite_response,
};
pub use errors::ProxyError;
