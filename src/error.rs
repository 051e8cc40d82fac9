//! Error types and the error responder.
//!
//! Two kinds of failure live here:
//!
//! - [`Error`] — infrastructure failures (binding a port, accepting a
//!   connection). These surface from [`Server::serve`](crate::Server::serve)
//!   and never reach a client.
//! - [`HttpError`] — per-request failures. Any middleware or handler stage
//!   can return one; it propagates up the chain and the [`ErrorResponder`]
//!   translates it into a uniform JSON envelope. This is the single point
//!   where internal failures become client-visible responses.

use chrono::{SecondsFormat, Utc};
use http::{Method, StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::response::Response;

// ── Infrastructure errors ─────────────────────────────────────────────────────

/// The error type returned by strata's fallible server operations.
///
/// Request-level failures are expressed as [`HttpError`], not as `Error`.
/// This type surfaces infrastructure failures: binding to a port or
/// accepting a connection.
#[derive(Debug, Error)]
#[error("io: {0}")]
pub struct Error(#[from] std::io::Error);

// ── Request-level errors ──────────────────────────────────────────────────────

/// A failure raised by a middleware stage or route handler.
///
/// Carries its own status hint; anything without one resolves to 500 at the
/// responder. Construct with the helpers or propagate foreign errors via
/// [`HttpError::internal`]:
///
/// ```rust
/// use strata::HttpError;
///
/// fn lookup(id: &str) -> Result<String, HttpError> {
///     if id == "42" {
///         Ok("alice".to_owned())
///     } else {
///         Err(HttpError::not_found())
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum HttpError {
    /// No route matched, or a handler declared the resource missing.
    #[error("Not Found")]
    NotFound,

    /// An explicit status + message pair.
    #[error("{1}")]
    Status(u16, String),

    /// Anything else. Resolves to 500; the wrapped error's display text
    /// becomes the client-visible message.
    #[error("{message}")]
    Internal { message: String, chain: String },
}

impl HttpError {
    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// A failure with an explicit status hint.
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status(code, message.into())
    }

    /// Wraps any error as a server failure, capturing its source chain —
    /// the closest thing a Rust error has to a stack trace.
    pub fn internal(err: impl std::error::Error) -> Self {
        let message = err.to_string();
        let mut chain = message.clone();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push_str("\n  caused by: ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Internal { message, chain }
    }

    /// The resolved response status. Out-of-range hints fall back to 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Status(code, _) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Variant name, used in non-production envelope details.
    fn name(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::Status(..) => "Status",
            Self::Internal { .. } => "Internal",
        }
    }

    /// The failure's full representation for log output and non-production
    /// envelope details.
    fn chain(&self) -> String {
        match self {
            Self::Internal { chain, .. } => chain.clone(),
            other => other.to_string(),
        }
    }
}

// ── Error responder ───────────────────────────────────────────────────────────

/// Translates a propagated [`HttpError`] into the uniform JSON envelope.
///
/// Last stage reachable on any failure path. It logs the failure, builds the
/// envelope, and cannot itself fail: a serialization problem degrades to a
/// static minimal body rather than tearing down the request.
pub(crate) struct ErrorResponder {
    production: bool,
}

impl ErrorResponder {
    pub(crate) fn new(production: bool) -> Self {
        Self { production }
    }

    /// Builds the envelope response for `err`.
    ///
    /// Severity follows the resolved status: 4xx is a client problem and
    /// logs at warn, 5xx logs at error. Stack detail goes into the body only
    /// outside production.
    pub(crate) fn respond(&self, err: &HttpError, method: &Method, path: &str, url: &str) -> Response {
        let status = err.status_code();
        let message = err.to_string();
        let chain = err.chain();

        if status.is_server_error() {
            error!(
                kind = "server",
                method = %method,
                path = %path,
                url = %url,
                status = status.as_u16(),
                error = %chain,
                "request failed: {message}",
            );
        } else {
            warn!(
                kind = "server",
                method = %method,
                path = %path,
                url = %url,
                status = status.as_u16(),
                error = %chain,
                "request failed: {message}",
            );
        }

        let mut envelope = json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
            },
            "success": false,
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "path": path,
        });
        if !self.production {
            envelope["error"]["details"] = json!({
                "name": err.name(),
                "stack": chain,
            });
        }

        let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| {
            br#"{"error":{"code":500,"message":"Internal Server Error"},"success":false}"#.to_vec()
        });
        Response::builder().status(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_json(res: &Response) -> serde_json::Value {
        serde_json::from_slice(res.body()).expect("envelope is valid json")
    }

    #[test]
    fn status_hint_is_respected() {
        let responder = ErrorResponder::new(true);
        let err = HttpError::status(404, "Not Found");
        let res = responder.respond(&err, &Method::GET, "/missing", "/missing");

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers().get("content-type").unwrap(), "application/json");
        let body = body_json(&res);
        assert_eq!(body["error"]["code"], 404);
        assert_eq!(body["error"]["message"], "Not Found");
        assert_eq!(body["success"], false);
        assert_eq!(body["path"], "/missing");
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn missing_hint_defaults_to_500() {
        let responder = ErrorResponder::new(true);
        let io = std::io::Error::other("pool exhausted");
        let res = responder.respond(&HttpError::internal(io), &Method::POST, "/orders", "/orders");
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&res)["error"]["message"], "pool exhausted");
    }

    #[test]
    fn out_of_range_hint_defaults_to_500() {
        let responder = ErrorResponder::new(true);
        let res = responder.respond(
            &HttpError::status(99, "bogus"),
            &Method::GET,
            "/",
            "/",
        );
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn production_envelope_has_no_details() {
        let responder = ErrorResponder::new(true);
        let io = std::io::Error::other("boom");
        let res = responder.respond(&HttpError::internal(io), &Method::GET, "/x", "/x");
        assert!(body_json(&res)["error"].get("details").is_none());
    }

    #[test]
    fn development_envelope_carries_stack() {
        let responder = ErrorResponder::new(false);
        let io = std::io::Error::other("boom");
        let res = responder.respond(&HttpError::internal(io), &Method::GET, "/x", "/x");
        let body = body_json(&res);
        assert_eq!(body["error"]["details"]["name"], "Internal");
        assert!(
            body["error"]["details"]["stack"]
                .as_str()
                .unwrap()
                .contains("boom")
        );
    }
}
