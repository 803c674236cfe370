use std::sync::Arc;

use ecoes_bff::{ApiClientError, Settings, build_http_client};

/// State shared by every request
///
/// Holds no per-request data: the backend client with its cookie cache is
/// created per request by [`crate::request_context`].
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, ApiClientError> {
        let http = build_http_client(settings.backend_timeout)?;
        Ok(Self {
            settings: Arc::new(settings),
            http,
        })
    }
}
