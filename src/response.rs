//! Outgoing HTTP response type, the [`IntoResponse`] conversion trait, and
//! the per-request [`ResponseHead`].
//!
//! Build a [`Response`] in your handler and return it. Middleware that needs
//! to decorate whatever response eventually comes back — correlation ids,
//! CORS headers, completion hooks — goes through [`ResponseHead`] instead of
//! waiting for the `Response` value to exist.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Csv,         // text/csv
    EventStream, // text/event-stream  (SSE)
    Html,        // text/html; charset=utf-8
    Json,        // application/json
    OctetStream, // application/octet-stream  (binary / file download)
    Text,        // text/plain; charset=utf-8
    Xml,         // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use strata::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use strata::Response;
/// use http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl Response {
    /// `200 OK` — `application/json`.
    ///
    /// Pass bytes from your serialiser directly:
    /// `serde_json::to_vec(&val)` or a hand-built `format!(…).into_bytes()`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::with_content_type("application/json", body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content_type("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Response with the given status and no body.
    pub fn status(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    /// The response status code.
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    fn with_content_type(content_type: &'static str, body: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self { status: StatusCode::OK, headers, body: Bytes::from(body) }
    }

    /// Converts into the hyper-facing response. Content-length is handled by
    /// the `Full` body.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header, replacing any previous value for the same name.
    /// Invalid names or values are dropped — a malformed header must not
    /// take down response construction.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish("application/json", body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with a typed body. Use this for XML, HTML, binary, SSE, etc.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type.as_str(), body)
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }

    fn finish(mut self, content_type: &'static str, body: Vec<u8>) -> Response {
        self.headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(content_type));
        Response { status: self.status, headers: self.headers, body: Bytes::from(body) }
    }
}

// ── ResponseHead ─────────────────────────────────────────────────────────────

type Finalizer = Box<dyn FnOnce(StatusCode) + Send + 'static>;

#[derive(Default)]
struct HeadState {
    headers: HeaderMap,
    finalizers: Vec<Finalizer>,
}

/// The in-flight outbound state of one request.
///
/// Created with the [`Request`](crate::Request) at pipeline entry and shared
/// with the dispatcher. Headers set here are merged onto whichever
/// [`Response`] the chain eventually produces, so middleware can decorate the
/// response before it exists — no buffered parallel copy to reconcile later.
///
/// [`ResponseHead::on_finalize`] registers a completion hook. The dispatcher
/// finalizes every response exactly once, on every path: normal handler
/// return, middleware short-circuit, or error translation. Hooks are
/// `FnOnce` and drained on the first call, so a stray second finalization is
/// a no-op rather than a double fire.
#[derive(Clone, Default)]
pub struct ResponseHead {
    inner: Arc<Mutex<HeadState>>,
}

impl ResponseHead {
    /// Sets a header on the eventual response, replacing any previous value
    /// for the same name (setting twice is idempotent, not additive).
    /// Invalid names or values are dropped.
    pub fn set_header(&self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.lock().headers.insert(name, value);
        }
    }

    /// Registers a hook to run when the response is finalized, receiving the
    /// final status code.
    pub fn on_finalize(&self, hook: impl FnOnce(StatusCode) + Send + 'static) {
        self.lock().finalizers.push(Box::new(hook));
    }

    /// Applies the promised headers onto `response`. Head entries win over
    /// handler-set headers of the same name.
    pub(crate) fn merge_into(&self, response: &mut Response) {
        let headers = std::mem::take(&mut self.lock().headers);
        for (name, value) in headers {
            if let Some(name) = name {
                response.headers.insert(name, value);
            }
        }
    }

    /// Runs all registered hooks with the final status. The registry is
    /// drained, so repeated calls are harmless.
    pub(crate) fn finalize(&self, status: StatusCode) {
        let finalizers = std::mem::take(&mut self.lock().finalizers);
        for hook in finalizers {
            hook(status);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeadState> {
        // A poisoned lock only means a hook panicked mid-registration; the
        // state itself is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`StatusCode`] directly from a handler.
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shortcut_sets_content_type() {
        let res = Response::json(br#"{"ok":true}"#.to_vec());
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.headers().get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn builder_header_replaces_same_name() {
        let res = Response::builder()
            .header("x-tag", "one")
            .header("x-tag", "two")
            .no_body();
        assert_eq!(res.headers().get("x-tag").unwrap(), "two");
    }

    #[test]
    fn builder_does_not_clobber_explicit_content_type() {
        let res = Response::builder()
            .header("content-type", "application/problem+json")
            .json(b"{}".to_vec());
        assert_eq!(
            res.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn head_merge_overrides_handler_header() {
        let head = ResponseHead::default();
        head.set_header("x-request-id", "from-head");
        let mut res = Response::builder().header("x-request-id", "from-handler").no_body();
        head.merge_into(&mut res);
        assert_eq!(res.headers().get("x-request-id").unwrap(), "from-head");
    }

    #[test]
    fn set_header_is_idempotent() {
        let head = ResponseHead::default();
        head.set_header("access-control-allow-origin", "*");
        head.set_header("access-control-allow-origin", "*");
        let mut res = Response::status(StatusCode::OK);
        head.merge_into(&mut res);
        let values: Vec<_> = res
            .headers()
            .get_all("access-control-allow-origin")
            .iter()
            .collect();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn finalize_runs_hooks_once() {
        let calls = Arc::new(Mutex::new(0u32));
        let head = ResponseHead::default();
        let sink = Arc::clone(&calls);
        head.on_finalize(move |_status| {
            *sink.lock().unwrap() += 1;
        });
        head.finalize(StatusCode::OK);
        head.finalize(StatusCode::OK);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn finalize_passes_final_status() {
        let seen = Arc::new(Mutex::new(None));
        let head = ResponseHead::default();
        let sink = Arc::clone(&seen);
        head.on_finalize(move |status| {
            *sink.lock().unwrap() = Some(status);
        });
        head.finalize(StatusCode::NOT_FOUND);
        assert_eq!(*seen.lock().unwrap(), Some(StatusCode::NOT_FOUND));
    }
}
