//! CORS policy adapter.
//!
//! [`CorsPolicy`](crate::policy::CorsPolicy) is written against a single
//! exchange object with chainable mutators; this chain hands middleware a
//! request and a `next` cursor. [`CorsAdapter`] bridges the two models:
//!
//! - a fresh [`PolicyExchange`] shim is built per request (no state survives
//!   between requests), forwarding header writes straight onto the request's
//!   in-flight [`ResponseHead`](crate::ResponseHead) — no buffered copy;
//! - the evaluator runs with a no-op continue callback: the adapter hosts
//!   exactly one evaluator, and the real chain's next step belongs to the
//!   framework, not to the foreign abstraction;
//! - a handled preflight terminates immediately with `204 No Content` and an
//!   empty body; the downstream chain never runs;
//! - a policy failure converts to [`HttpError`] and propagates to the error
//!   responder, never swallowed here.

use std::sync::Arc;

use http::{Method, StatusCode};

use crate::error::HttpError;
use crate::handler::HandlerFuture;
use crate::middleware::{Middleware, Next};
use crate::policy::{CorsPolicy, PolicyError, PolicyExchange};
use crate::request::Request;
use crate::response::{Response, ResponseHead};

/// Hosts the CORS policy evaluator as a chain middleware.
pub struct CorsAdapter {
    policy: Arc<CorsPolicy>,
}

impl CorsAdapter {
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy: Arc::new(policy) }
    }
}

impl Middleware for CorsAdapter {
    fn handle(&self, req: Request, next: Next) -> HandlerFuture {
        let policy = Arc::clone(&self.policy);
        Box::pin(async move {
            let verdict = {
                let mut exchange = Exchange::new(&req);
                // There is no foreign middleware behind the evaluator; the
                // real chain continues below.
                let mut noop = || {};
                policy
                    .evaluate(&mut exchange, &mut noop)
                    .map(|()| exchange.verdict())
            };

            match verdict {
                Ok(Some(status)) => Ok(Response::status(status)),
                Ok(None) => next.run(req).await,
                Err(err) => Err(HttpError::from(err)),
            }
        })
    }
}

impl From<PolicyError> for HttpError {
    fn from(err: PolicyError) -> Self {
        HttpError::status(err.status_code().as_u16(), err.to_string())
    }
}

/// Per-request shim translating the chain's request/head pair into the
/// single-object shape the evaluator expects.
struct Exchange<'a> {
    req: &'a Request,
    head: &'a ResponseHead,
    status: Option<StatusCode>,
    handled: bool,
}

impl<'a> Exchange<'a> {
    fn new(req: &'a Request) -> Self {
        Self { req, head: req.response_head(), status: None, handled: false }
    }

    /// `Some(status)` when the evaluator answered the exchange itself.
    fn verdict(&self) -> Option<StatusCode> {
        if self.handled {
            Some(self.status.unwrap_or(StatusCode::NO_CONTENT))
        } else {
            None
        }
    }
}

impl PolicyExchange for Exchange<'_> {
    fn request_header(&self, name: &str) -> Option<String> {
        self.req.header(name).map(str::to_owned)
    }

    fn method(&self) -> Method {
        self.req.method().clone()
    }

    fn url(&self) -> String {
        self.req.uri().to_string()
    }

    fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.head.set_header(name, value);
        self
    }

    fn finish(&mut self) {
        self.handled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorResponder;
    use crate::middleware::Pipeline;
    use crate::router::Router;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn data(_req: Request) -> Response {
        Response::text("data")
    }

    fn cors_pipeline(policy: CorsPolicy) -> Pipeline {
        Pipeline::new(
            vec![Arc::new(CorsAdapter::new(policy))],
            Router::new().get("/data", data).on(Method::OPTIONS, "/data", data),
            ErrorResponder::new(true),
        )
    }

    #[tokio::test]
    async fn preflight_terminates_with_204_and_no_body() {
        static PREFLIGHT_HANDLER_RAN: AtomicBool = AtomicBool::new(false);
        async fn marking(_req: Request) -> Response {
            PREFLIGHT_HANDLER_RAN.store(true, Ordering::SeqCst);
            Response::text("data")
        }
        let p = Pipeline::new(
            vec![Arc::new(CorsAdapter::new(CorsPolicy::with_origins(vec![
                "https://app.example".into(),
            ])))],
            Router::new().on(Method::OPTIONS, "/data", marking).get("/data", marking),
            ErrorResponder::new(true),
        );
        let res = p
            .handle(Request::test(
                Method::OPTIONS,
                "/data",
                &[("origin", "https://app.example")],
            ))
            .await;

        assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
        assert!(res.body().is_empty());
        assert_eq!(
            res.headers().get("access-control-allow-origin").unwrap(),
            "https://app.example"
        );
        assert_eq!(res.headers().get("access-control-max-age").unwrap(), "86400");
        assert!(res.headers().get("access-control-allow-methods").is_some());
        assert!(!PREFLIGHT_HANDLER_RAN.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn simple_request_gets_headers_and_reaches_handler() {
        let p = cors_pipeline(CorsPolicy::with_origins(vec!["https://app.example".into()]));
        let res = p
            .handle(Request::test(
                Method::GET,
                "/data",
                &[("origin", "https://app.example")],
            ))
            .await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"data");
        assert_eq!(
            res.headers().get("access-control-allow-origin").unwrap(),
            "https://app.example"
        );
    }

    #[tokio::test]
    async fn denied_origin_becomes_403_envelope_without_allow_header() {
        let p = cors_pipeline(CorsPolicy::with_origins(vec!["https://app.example".into()]));
        let res = p
            .handle(Request::test(
                Method::GET,
                "/data",
                &[("origin", "https://evil.example")],
            ))
            .await;

        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert!(res.headers().get("access-control-allow-origin").is_none());
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["error"]["code"], 403);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn request_without_origin_is_untouched() {
        let p = cors_pipeline(CorsPolicy::with_origins(vec!["https://app.example".into()]));
        let res = p.handle(Request::test(Method::GET, "/data", &[])).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(res.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn wildcard_preflight_allows_any_origin() {
        let p = cors_pipeline(CorsPolicy::new(crate::policy::CorsConfig::default()));
        let res = p
            .handle(Request::test(
                Method::OPTIONS,
                "/data",
                &[("origin", "https://anywhere.example")],
            ))
            .await;

        assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers().get("access-control-allow-origin").unwrap(), "*");
    }
}
