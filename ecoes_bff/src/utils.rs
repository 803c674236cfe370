use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
use thiserror::Error;

use crate::config::CookieAttributes;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UtilError {
    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

/// A cookie carried in a backend `Set-Cookie` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<i64>,
    /// `Expires` attribute, verbatim
    pub expires: Option<String>,
}

/// Split a `Cookie` request header into `(name, value)` pairs
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .map(str::trim)
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Collect every cookie from the `Cookie` headers of a request
///
/// Headers are decoded lossily so a single non-ASCII cookie does not hide the
/// others.
pub fn cookies_from_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .flat_map(|value| parse_cookie_header(&String::from_utf8_lossy(value.as_bytes())))
        .collect()
}

/// Parse one `Set-Cookie` header value. The value is kept verbatim.
pub fn parse_set_cookie(header: &str) -> Option<SetCookie> {
    let mut segments = header.split(';');
    let (name, value) = segments.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut max_age = None;
    let mut expires = None;
    for attr in segments {
        let Some((key, val)) = attr.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("max-age") {
            max_age = val.trim().parse::<i64>().ok();
        } else if key.eq_ignore_ascii_case("expires") {
            expires = Some(val.trim().to_string());
        }
    }

    Some(SetCookie {
        name: name.to_string(),
        value: value.trim().to_string(),
        max_age,
        expires,
    })
}

/// Parsed cookies of every `Set-Cookie` header in `headers`
pub fn set_cookies_from_headers(headers: &HeaderMap) -> Vec<SetCookie> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(parse_set_cookie)
        .collect()
}

pub fn format_set_cookie(
    name: &str,
    value: &str,
    max_age: Option<i64>,
    attrs: CookieAttributes,
) -> String {
    let mut cookie = format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/");
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if attrs.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn format_expired_cookie(name: &str, attrs: CookieAttributes) -> String {
    let mut cookie = format!(
        "{name}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
    );
    if attrs.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Re-issue a backend cookie under local attributes, keeping its lifetime
pub fn format_backend_cookie(cookie: &SetCookie, attrs: CookieAttributes) -> String {
    let mut formatted = format_set_cookie(&cookie.name, &cookie.value, cookie.max_age, attrs);
    if let Some(expires) = &cookie.expires {
        formatted.push_str(&format!("; Expires={expires}"));
    }
    formatted
}

pub fn header_set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    max_age: Option<i64>,
    attrs: CookieAttributes,
) -> Result<(), UtilError> {
    let cookie = format_set_cookie(name, value, max_age, attrs);
    append_set_cookie(headers, &cookie)
}

pub fn header_set_backend_cookie(
    headers: &mut HeaderMap,
    cookie: &SetCookie,
    attrs: CookieAttributes,
) -> Result<(), UtilError> {
    append_set_cookie(headers, &format_backend_cookie(cookie, attrs))
}

pub fn header_expire_cookie(
    headers: &mut HeaderMap,
    name: &str,
    attrs: CookieAttributes,
) -> Result<(), UtilError> {
    let cookie = format_expired_cookie(name, attrs);
    append_set_cookie(headers, &cookie)
}

fn append_set_cookie(headers: &mut HeaderMap, cookie: &str) -> Result<(), UtilError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| UtilError::Cookie("Failed to parse cookie".to_string()))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}
