mod core;
mod errors;
mod types;

pub use core::{ApiClient, build_http_client};
pub use errors::ApiClientError;
pub use types::{ApiRequest, ApiResponse, CookieJar, RefreshFailure, RefreshOutcome};

pub(crate) use core::normalize_path;
