//! Response classification and error-message extraction.
//!
//! Bitbucket Server does not guarantee a single error-envelope shape across
//! endpoints, so failure messages are resolved with a two-tier fallback:
//! `errors[0].message` when the body carries the documented envelope, the raw
//! body text otherwise.

use serde_json::{Map, Value};
use tracing::error;

use crate::errors::Error;

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

/// Classifies a response and extracts its normalized JSON payload.
///
/// An empty or blank body is treated as an empty object; a non-empty body
/// that is not valid JSON is a [`Error::Protocol`] regardless of status. A
/// 2xx status yields the parsed body; anything else yields
/// [`Error::RequestFailed`] carrying the resolved message and the original
/// status.
pub(crate) async fn interpret(response: reqwest::Response) -> Result<Value, Error> {
    let status = response.status();
    let text = response.text().await.map_err(Error::Transport)?;

    let body = if text.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(&text).map_err(|source| Error::Protocol { source })?
    };

    if status.is_success() {
        return Ok(body);
    }

    let message = resolve_error_message(&body, &text);
    error!(status = status.as_u16(), message, "error response from server");
    Err(Error::RequestFailed {
        status: status.as_u16(),
        message,
    })
}

/// Resolves the display message for a failed response.
///
/// Prefers `errors[0].message`; falls back to the raw body text (or the
/// serialized empty object when the body was blank).
fn resolve_error_message(body: &Value, raw: &str) -> String {
    body.get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|first| first.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if raw.trim().is_empty() {
                body.to_string()
            } else {
                raw.to_string()
            }
        })
}
