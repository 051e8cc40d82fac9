//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the place for
//! cross-cutting concerns: structured request logging, CORS policy
//! evaluation, request-id injection.
//!
//! The model is a linear chain. Each [`Middleware`] receives the request and
//! a [`Next`] cursor; it may short-circuit with its own response, fail with
//! an [`HttpError`], or call `next.run(req)` to continue. The terminal stage
//! is the router: a matched handler runs, a miss becomes
//! [`HttpError::NotFound`]. Whatever comes back — handler response,
//! short-circuit, or the error responder's envelope — passes through the
//! single finalization point in [`Pipeline::handle`], which merges the
//! in-flight [`ResponseHead`](crate::ResponseHead) headers and fires the
//! completion hooks exactly once.
//!
//! Built-in middleware:
//! - [`trace::Trace`] — per-request logging with correlation id, status,
//!   latency
//! - [`cors::CorsAdapter`] — hosts the single-exchange CORS policy
//!   evaluator inside the chain
//! - [`redact`] — sensitive-header filtering for log output

pub mod cors;
pub mod redact;
pub mod trace;

use std::sync::Arc;

use http::Method;

use crate::error::{ErrorResponder, HttpError};
use crate::handler::HandlerFuture;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// A stage in the request pipeline.
///
/// Implementations must be cheap to share: one instance serves every
/// concurrent request. Per-request state belongs in locals captured by the
/// returned future, never in `self`.
pub trait Middleware: Send + Sync + 'static {
    /// Handles `req`, either producing a response directly or delegating to
    /// the rest of the chain via `next.run(req)`.
    fn handle(&self, req: Request, next: Next) -> HandlerFuture;
}

/// The remainder of the chain from one middleware's point of view.
///
/// Consumed by [`Next::run`]; a middleware that never calls it
/// short-circuits the chain.
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    router: Arc<Router>,
}

impl Next {
    /// Runs the rest of the chain: the next middleware if one remains,
    /// otherwise the router terminal.
    pub fn run(self, req: Request) -> HandlerFuture {
        if let Some(mw) = self.chain.get(self.index) {
            let mw = Arc::clone(mw);
            let next = Next {
                chain: Arc::clone(&self.chain),
                index: self.index + 1,
                router: Arc::clone(&self.router),
            };
            mw.handle(req, next)
        } else {
            let router = self.router;
            Box::pin(async move {
                match router.lookup(req.method(), req.path()) {
                    Some((handler, params)) => {
                        let mut req = req;
                        req.set_params(params);
                        handler.call(req).await
                    }
                    None => Err(HttpError::not_found()),
                }
            })
        }
    }
}

/// The assembled request pipeline: middleware chain, router terminal, and
/// error responder. Built once at startup, shared across connections.
pub(crate) struct Pipeline {
    chain: Arc<[Arc<dyn Middleware>]>,
    router: Arc<Router>,
    responder: ErrorResponder,
}

impl Pipeline {
    pub(crate) fn new(
        middleware: Vec<Arc<dyn Middleware>>,
        router: Router,
        responder: ErrorResponder,
    ) -> Self {
        Self {
            chain: middleware.into(),
            router: Arc::new(router),
            responder,
        }
    }

    /// Runs one request through the chain and finalizes the outcome.
    ///
    /// Every path converges here: normal handler return, middleware
    /// short-circuit, or error translation. The in-flight head is merged and
    /// finalized exactly once per request, after the final status is known.
    pub(crate) async fn handle(&self, req: Request) -> Response {
        let head = req.response_head().clone();
        let method = req.method().clone();
        let path = req.path().to_owned();
        let url = req.uri().to_string();

        let next = Next {
            chain: Arc::clone(&self.chain),
            index: 0,
            router: Arc::clone(&self.router),
        };
        let mut response = match next.run(req).await {
            Ok(response) => response,
            Err(err) => self.responder.respond(&err, &method, &path, &url),
        };

        head.merge_into(&mut response);
        head.finalize(response.status_code());
        response
    }

    /// Translates a failure for a request that never entered the chain
    /// (e.g. the body could not be read). No head exists yet, so there is
    /// nothing to merge or finalize.
    pub(crate) fn reject(&self, err: &HttpError, method: &Method, path: &str, url: &str) -> Response {
        self.responder.respond(err, method, path, url)
    }
}
