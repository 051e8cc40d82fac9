//! Per-request logging middleware.
//!
//! [`Trace`] sits at the outermost position of the chain. On the way in it
//! resolves a correlation id, promises it back to the client as
//! `x-request-id`, and logs the request at debug with its redacted headers.
//! On the way out — whichever way out — a finalize hook logs the completion
//! with latency, at a severity derived from the final status.
//!
//! The hook is registered on the request's
//! [`ResponseHead`](crate::ResponseHead) and fired by the dispatcher, so it
//! runs for normal returns, middleware short-circuits, and error envelopes
//! alike, and never more than once.

use std::time::Instant;

use http::StatusCode;
use tracing::{Level, debug, error, info, warn};
use uuid::Uuid;

use crate::handler::HandlerFuture;
use crate::middleware::redact;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

/// Correlation header read from the request and always set on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request/response logging middleware.
#[derive(Default)]
pub struct Trace;

impl Trace {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Trace {
    fn handle(&self, req: Request, next: Next) -> HandlerFuture {
        let start = Instant::now();
        let id = req
            .header(REQUEST_ID_HEADER)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(request_id);

        let head = req.response_head().clone();
        head.set_header(REQUEST_ID_HEADER, &id);

        let method = req.method().clone();
        let url = req.uri().to_string();
        let path = req.path().to_owned();

        debug!(
            kind = "request",
            id = %id,
            method = %method,
            url = %url,
            path = %path,
            query = req.query().unwrap_or(""),
            headers = ?redact::filter(req.headers()),
            remote = %req.remote_address(),
            "request received",
        );

        head.on_finalize(move |status| {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            let code = status.as_u16();
            match completion_level(status) {
                Level::ERROR => error!(
                    kind = "response",
                    id = %id,
                    method = %method,
                    path = %path,
                    status = code,
                    elapsed_ms,
                    "{method} {path} {code} in {elapsed_ms}ms",
                ),
                Level::WARN => warn!(
                    kind = "response",
                    id = %id,
                    method = %method,
                    path = %path,
                    status = code,
                    elapsed_ms,
                    "{method} {path} {code} in {elapsed_ms}ms",
                ),
                _ => info!(
                    kind = "response",
                    id = %id,
                    method = %method,
                    path = %path,
                    status = code,
                    elapsed_ms,
                    "{method} {path} {code} in {elapsed_ms}ms",
                ),
            }
        });

        next.run(req)
    }
}

/// Completion log severity for a final status code.
fn completion_level(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else {
        Level::INFO
    }
}

/// A fresh random correlation id: 128 random bits rendered in base-36.
fn request_id() -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = Uuid::new_v4().as_u128();
    let mut buf = Vec::with_capacity(25);
    loop {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
