//! Function key authentication.
//!
//! Mirrors the key check a Functions host applies to `AuthorizationLevel.Function` triggers: the
//! caller presents a key either in the `x-functions-key` header or in the `code` query parameter.
//! When no keys are configured the check is disabled.

use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::trace;

use crate::{AppState, errors::Error};

/// Header carrying the function key.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";
/// Query parameter carrying the function key.
pub const FUNCTION_KEY_QUERY_PARAM: &str = "code";

/// Extract the presented key, preferring the header over the query string.
fn presented_key(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(FUNCTION_KEY_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }

    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == FUNCTION_KEY_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Whether `presented` matches one of `keys`.
pub(crate) fn is_authorised(keys: &[String], presented: Option<&str>) -> bool {
    if keys.is_empty() {
        return true;
    }
    let Some(presented) = presented else {
        return false;
    };
    // Check every key so timing does not reveal which one matched
    keys.iter()
        .fold(false, |found, key| constant_time_eq(key.as_bytes(), presented.as_bytes()) | found)
}

/// Constant-time comparison of a configured `key` against a `presented` value.
///
/// Running time depends only on the length of `presented`.
fn constant_time_eq(key: &[u8], presented: &[u8]) -> bool {
    let mut result = key.len() ^ presented.len();
    for (i, y) in presented.iter().enumerate() {
        let x = if key.is_empty() { 0 } else { key[i % key.len()] };
        result |= usize::from(x ^ y);
    }
    result == 0
}

/// Middleware rejecting requests that do not carry a configured function key.
pub async fn function_key_middleware(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let keys = &state.config.auth.function_keys;
    if keys.is_empty() {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    if !is_authorised(keys, presented_key(&parts).as_deref()) {
        return Err(Error::Unauthenticated);
    }
    trace!("Function key accepted for {}", parts.uri.path());

    Ok(next.run(Request::from_parts(parts, body)).await)
}
