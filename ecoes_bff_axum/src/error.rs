use askama::Template;
use axum::{
    Json,
    extract::FromRequestParts,
    response::{Html, IntoResponse, Response},
};
use http::{HeaderMap, StatusCode, header, request::Parts};
use serde_json::json;
use thiserror::Error;

use ecoes_bff::SessionError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Página no encontrada")]
    NotFound,

    #[error("Acceso denegado")]
    Forbidden,

    #[error("No autenticado")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    /// Detail is logged, never sent to the client
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Error interno del servidor".to_string(),
            other => other.to_string(),
        }
    }

    pub fn with_format(self, format: ErrorFormat) -> ErrorResponse {
        ErrorResponse {
            format,
            error: self,
        }
    }
}

/// How an error is rendered for the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    Html,
    Json,
}

impl ErrorFormat {
    /// JSON when the client asks for it or sends it, or when it is an XHR call
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let contains_json = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("application/json"))
        };
        let is_xhr = headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        if contains_json(header::ACCEPT) || contains_json(header::CONTENT_TYPE) || is_xhr {
            ErrorFormat::Json
        } else {
            ErrorFormat::Html
        }
    }
}

impl<S> FromRequestParts<S> for ErrorFormat
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        Ok(ErrorFormat::from_headers(&parts.headers))
    }
}

#[derive(Template)]
#[template(path = "error.j2")]
struct ErrorTemplate<'a> {
    status: u16,
    message: &'a str,
}

/// An [`AppError`] bound to the format it must be rendered in
#[derive(Debug)]
pub struct ErrorResponse {
    pub format: ErrorFormat,
    pub error: AppError,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.error.status();
        match &self.error {
            AppError::Internal(detail) => tracing::error!("Request failed: {}", detail),
            other => tracing::debug!("Request rejected with {}: {}", status, other),
        }

        let message = self.error.public_message();
        match self.format {
            ErrorFormat::Json => (status, Json(json!({ "error": message }))).into_response(),
            ErrorFormat::Html => {
                let template = ErrorTemplate {
                    status: status.as_u16(),
                    message: &message,
                };
                match template.render() {
                    Ok(html) => (status, Html(html)).into_response(),
                    Err(e) => {
                        tracing::error!("Failed to render error page: {}", e);
                        (status, message).into_response()
                    }
                }
            }
        }
    }
}

/// Helper trait for converting library errors into an [`AppError`]
pub(crate) trait IntoAppError<T> {
    fn into_app_error(self) -> Result<T, AppError>;
}

impl<T> IntoAppError<T> for Result<T, SessionError> {
    fn into_app_error(self) -> Result<T, AppError> {
        self.map_err(|e| match e {
            SessionError::InvalidRole(role) => AppError::BadRequest(format!("Rol inválido: {role}")),
            other => AppError::Internal(other.to_string()),
        })
    }
}

/// Router fallback
pub async fn not_found(format: ErrorFormat) -> ErrorResponse {
    AppError::NotFound.with_format(format)
}
