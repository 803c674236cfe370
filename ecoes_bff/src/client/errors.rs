use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum ApiClientError {
    /// Connection refused, reset, DNS failure or a malformed response
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Backend did not answer within the timeout: {0}")]
    Timeout(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    Header(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl From<reqwest::Error> for ApiClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
