//! Response envelopes and JSON/redirect negotiation.
//!
//! Read endpoints always return the `{ "data": ... }` envelope. Mutating
//! endpoints negotiate: an XHR/JSON caller gets the envelope, a plain
//! browser form post gets a 303 redirect back to the notification list with
//! a flash cookie carrying the human-readable outcome. Both paths perform
//! the same underlying state change.

use axum::extract::FromRequestParts;
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Where a mutating handler should send its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// The caller asked for JSON (XHR header or an `application/json` Accept).
    Json,
    /// A plain browser navigation; answer with redirect + flash.
    Redirect,
}

impl ResponseMode {
    /// Detect the caller's preference from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let is_xhr = headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"));

        let wants_json = headers
            .get("accept")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        if is_xhr || wants_json {
            ResponseMode::Json
        } else {
            ResponseMode::Redirect
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ResponseMode {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ResponseMode::from_headers(&parts.headers))
    }
}

/// Where redirect-mode mutations land.
const NOTIFICATIONS_PAGE: &str = "/notifications";

/// Flash cookie lifetime in seconds.
const FLASH_MAX_AGE_SECS: u32 = 60;

/// Answer a mutation according to the negotiated mode.
///
/// JSON mode returns `{ "data": ... }`; redirect mode issues a 303 back to
/// the notification list with the flash message in a short-lived cookie.
pub fn mutation_reply<T: Serialize>(mode: ResponseMode, data: T, flash: &str) -> Response {
    match mode {
        ResponseMode::Json => Json(DataResponse { data }).into_response(),
        ResponseMode::Redirect => {
            let cookie = format!(
                "flash={}; Path=/; Max-Age={FLASH_MAX_AGE_SECS}; SameSite=Lax",
                encode_cookie_value(flash)
            );
            let mut response = Redirect::to(NOTIFICATIONS_PAGE).into_response();
            match cookie.parse() {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Flash cookie construction failed");
                }
            }
            response
        }
    }
}

/// Percent-encode the characters RFC 6265 forbids in a cookie value.
fn encode_cookie_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'%' | b'"' | b',' | b';' | b'\\' | b' ' => {
                encoded.push('%');
                encoded.push_str(&format!("{byte:02X}"));
            }
            0x21..=0x7E => encoded.push(byte as char),
            _ => {
                encoded.push('%');
                encoded.push_str(&format!("{byte:02X}"));
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn xhr_header_selects_json() {
        let h = headers(&[("x-requested-with", "XMLHttpRequest")]);
        assert_eq!(ResponseMode::from_headers(&h), ResponseMode::Json);
    }

    #[test]
    fn json_accept_selects_json() {
        let h = headers(&[("accept", "application/json, text/plain")]);
        assert_eq!(ResponseMode::from_headers(&h), ResponseMode::Json);
    }

    #[test]
    fn plain_browser_request_selects_redirect() {
        let h = headers(&[("accept", "text/html,application/xhtml+xml")]);
        assert_eq!(ResponseMode::from_headers(&h), ResponseMode::Redirect);
        assert_eq!(ResponseMode::from_headers(&HeaderMap::new()), ResponseMode::Redirect);
    }

    #[test]
    fn cookie_value_encoding_covers_forbidden_characters() {
        assert_eq!(encode_cookie_value("marked-read"), "marked-read");
        assert_eq!(encode_cookie_value("3 marked read"), "3%20marked%20read");
        assert_eq!(encode_cookie_value("a;b,c\"d"), "a%3Bb%2Cc%22d");
    }

    #[test]
    fn redirect_reply_carries_flash_cookie() {
        let response = mutation_reply(
            ResponseMode::Redirect,
            serde_json::json!({"count": 3}),
            "3 notifications marked read",
        );
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .expect("flash cookie present")
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("flash="));
        assert!(cookie.contains("Max-Age=60"));
        // Never echo raw spaces into the cookie value.
        let value = cookie.split(';').next().unwrap();
        assert!(!value.contains(' '));
    }

    #[test]
    fn json_reply_uses_data_envelope() {
        let response = mutation_reply(ResponseMode::Json, serde_json::json!({"count": 1}), "done");
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
