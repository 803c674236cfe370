//! Central configuration for the ecoes_bff crate
//!
//! Settings are resolved once at start-up from the process environment and
//! shared read-only afterwards (wrapped in an `Arc` by the web layer).

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Access token cookie issued by the backend
pub const AUTH_TOKEN_COOKIE: &str = "auth_token";
/// Refresh token cookie issued by the backend
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const HEALTH_PATH: &str = "/health";

/// Proxy endpoints reachable without an `auth_token` cookie
pub const PUBLIC_PROXY_ENDPOINTS: &[&str] = &["auth/login", "api/contact/send"];

const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5050;
const DEFAULT_SESSION_COOKIE_NAME: &str = "session";

const REQUIRED_VARS: &[&str] = &[
    "BACKEND_API_URL",
    "WEBSOCKET_URL",
    "PROXY_PREFIX",
    "SECRET_KEY",
    "SESSION_LIFETIME",
    "DEBUG",
    "CORS_ORIGINS",
    "IMAGES_SERVICE_BASE_URL",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Attributes applied to every cookie this service sets on the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieAttributes {
    pub secure: bool,
}

/// Public contact information exposed to the browser
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactConfig {
    pub recipient_email: Option<String>,
    pub company_phone: Option<String>,
    pub email_subject: Option<String>,
    pub whatsapp_message: Option<String>,
    pub email_body_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend_api_url: String,
    pub websocket_url: String,
    pub proxy_prefix: String,
    pub secret_key: String,
    pub session_lifetime: Duration,
    pub session_cookie_name: String,
    pub debug: bool,
    /// `None` when `COOKIE_SECURE` was not set and the value was derived from `DEBUG`
    pub cookie_secure_override: Option<bool>,
    pub cors_origins: Vec<String>,
    pub images_service_base_url: String,
    pub backend_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub contact: ContactConfig,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|key| get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let required = |key: &'static str| get(key).unwrap_or_default();

        let backend_api_url = parse_base_url("BACKEND_API_URL", &required("BACKEND_API_URL"))?;
        let websocket_url = parse_base_url("WEBSOCKET_URL", &required("WEBSOCKET_URL"))?;
        let images_service_base_url =
            parse_base_url("IMAGES_SERVICE_BASE_URL", &required("IMAGES_SERVICE_BASE_URL"))?;
        let proxy_prefix = parse_proxy_prefix(&required("PROXY_PREFIX"))?;

        let session_lifetime = required("SESSION_LIFETIME")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigError::Invalid {
                name: "SESSION_LIFETIME",
                reason: "expected a positive number of seconds".to_string(),
            })?;

        let backend_timeout = match get("BACKEND_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "BACKEND_TIMEOUT_SECS",
                    reason: "expected a positive number of seconds".to_string(),
                })?,
        };

        let port = match get("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            backend_api_url,
            websocket_url,
            proxy_prefix,
            secret_key: required("SECRET_KEY"),
            session_lifetime,
            session_cookie_name: get("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE_NAME.to_string()),
            debug: parse_bool_flag(&required("DEBUG")),
            cookie_secure_override: get("COOKIE_SECURE").map(|v| parse_bool_flag(&v)),
            cors_origins: parse_origins(&required("CORS_ORIGINS")),
            images_service_base_url,
            backend_timeout,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            contact: ContactConfig {
                recipient_email: get("RECIPIENT_EMAIL"),
                company_phone: get("COMPANY_PHONE"),
                email_subject: get("EMAIL_SUBJECT"),
                whatsapp_message: get("WHATSAPP_MESSAGE"),
                email_body_message: get("EMAIL_BODY_MESSAGE"),
            },
        })
    }

    /// Whether cookies set on the browser carry the `Secure` attribute
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure_override.unwrap_or(!self.debug)
    }

    pub fn cookie_attributes(&self) -> CookieAttributes {
        CookieAttributes {
            secure: self.cookie_secure(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Contact configuration safe to expose to the browser, HTML-escaped
    pub fn public_config(&self) -> BTreeMap<&'static str, String> {
        let c = &self.contact;
        let mut config = BTreeMap::new();
        for (key, value) in [
            ("recipientEmail", &c.recipient_email),
            ("companyPhone", &c.company_phone),
            ("emailSubject", &c.email_subject),
            ("whatsappMessage", &c.whatsapp_message),
            ("emailBodyMessage", &c.email_body_message),
        ] {
            config.insert(key, value.as_deref().map(sanitize).unwrap_or_default());
        }
        config.insert(
            "apiUrl",
            sanitize(&format!("{}/api/contact/send", self.proxy_prefix)),
        );
        config
    }

    pub fn log_summary(&self) {
        tracing::info!("Backend URL: {}", self.backend_api_url);
        tracing::info!("Proxy prefix: {}", self.proxy_prefix);
        tracing::info!("WebSocket URL: {}", self.websocket_url);
        tracing::info!("Images service: {}", self.images_service_base_url);
        tracing::info!("Debug mode: {}", self.debug);
        tracing::info!("Secret key: {}", mask_secret(&self.secret_key));
        tracing::info!("Session lifetime: {}s", self.session_lifetime.as_secs());
        tracing::info!("Backend timeout: {}s", self.backend_timeout.as_secs());
        if self.cookie_secure_override.is_none() {
            tracing::warn!(
                "COOKIE_SECURE not set, Secure cookie flag derived from DEBUG: {}",
                self.cookie_secure()
            );
        }
    }
}

/// `true`, `1`, `yes` and `on` (any case) are true, everything else is false
pub fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_base_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(ConfigError::Invalid {
            name,
            reason: "not an absolute URL".to_string(),
        });
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_proxy_prefix(value: &str) -> Result<String, ConfigError> {
    if !value.starts_with('/') || value.len() < 2 || value.ends_with('/') {
        return Err(ConfigError::Invalid {
            name: "PROXY_PREFIX",
            reason: "must start with '/' and must not end with '/'".to_string(),
        });
    }
    Ok(value.to_string())
}

fn sanitize(value: &str) -> String {
    value
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 4 {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("***{tail}")
    } else {
        "****".to_string()
    }
}
