//! Signed session cookie
//!
//! The cookie value is `base64(json).base64(hmac_sha256(base64(json)))`, both
//! parts URL-safe without padding. The session is not encrypted, only
//! protected against tampering.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use http::HeaderMap;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::SessionError;
use super::types::Session;
use crate::config::Settings;
use crate::utils::{cookies_from_headers, header_expire_cookie, header_set_cookie};

type HmacSha256 = Hmac<Sha256>;

fn sign(payload: &str, secret: &[u8]) -> Result<Vec<u8>, SessionError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| SessionError::Crypto(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn encode_session(session: &Session, secret: &str) -> Result<String, SessionError> {
    let json = serde_json::to_vec(session).map_err(|e| SessionError::Format(e.to_string()))?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let signature = URL_SAFE_NO_PAD.encode(sign(&payload, secret.as_bytes())?);
    Ok(format!("{payload}.{signature}"))
}

pub fn decode_session(value: &str, secret: &str) -> Result<Session, SessionError> {
    let (payload, signature) = value
        .split_once('.')
        .ok_or_else(|| SessionError::Format("missing signature".to_string()))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|e| SessionError::Format(e.to_string()))?;
    let expected = sign(payload, secret.as_bytes())?;
    if !bool::from(expected.ct_eq(&signature)) {
        return Err(SessionError::Signature);
    }

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| SessionError::Format(e.to_string()))?;
    let session: Session =
        serde_json::from_slice(&json).map_err(|e| SessionError::Format(e.to_string()))?;

    if session.is_expired(Utc::now()) {
        return Err(SessionError::Expired);
    }
    Ok(session)
}

/// Session carried by the request headers, if any
///
/// Any decoding failure is logged and treated as "no session".
pub fn session_from_headers(headers: &HeaderMap, settings: &Settings) -> Option<Session> {
    let (_, value) = cookies_from_headers(headers)
        .into_iter()
        .find(|(name, _)| name == &settings.session_cookie_name)?;

    match decode_session(&value, &settings.secret_key) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!("Ignoring session cookie: {}", e);
            None
        }
    }
}

/// `Set-Cookie` header storing `session`
///
/// Permanent sessions get `Max-Age = SESSION_LIFETIME`; other sessions end
/// with the browser.
pub fn prepare_session_headers(
    session: &Session,
    settings: &Settings,
) -> Result<HeaderMap, SessionError> {
    let value = encode_session(session, &settings.secret_key)?;
    let max_age = session
        .permanent
        .then(|| i64::try_from(settings.session_lifetime.as_secs()).unwrap_or(i64::MAX));

    let mut headers = HeaderMap::new();
    header_set_cookie(
        &mut headers,
        &settings.session_cookie_name,
        &value,
        max_age,
        settings.cookie_attributes(),
    )?;
    Ok(headers)
}

pub fn prepare_clear_session_headers(settings: &Settings) -> Result<HeaderMap, SessionError> {
    let mut headers = HeaderMap::new();
    header_expire_cookie(
        &mut headers,
        &settings.session_cookie_name,
        settings.cookie_attributes(),
    )?;
    Ok(headers)
}
