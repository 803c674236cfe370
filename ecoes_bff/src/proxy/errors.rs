use thiserror::Error;

use crate::client::ApiClientError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum ProxyError {
    /// Non-public endpoint called without an `auth_token` cookie
    #[error("Proxy call without auth cookie: {0}")]
    Unauthenticated(String),

    #[error("Backend call failed: {0}")]
    Upstream(#[from] ApiClientError),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
