//! HTTP server, request dispatch, and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Letting in-flight connection tasks run to completion, for at most
//!    [`DRAIN_GRACE`]. Log emission is synchronous fire-and-forget, so
//!    draining never waits on the logging sink.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly —
//!    after the grace period expires, stragglers are abandoned rather than
//!    holding the process hostage.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::{Error, ErrorResponder, HttpError};
use crate::middleware::{Middleware, Pipeline};
use crate::request::Request;
use crate::router::Router;

/// How long in-flight requests may keep running after a shutdown signal.
const DRAIN_GRACE: Duration = Duration::from_secs(10);

/// The HTTP server.
///
/// Assembles the middleware pipeline at [`serve`](Server::serve) time; the
/// chain runs in registration order, outermost first:
///
/// ```rust,no_run
/// use strata::middleware::{cors::CorsAdapter, trace::Trace};
/// use strata::{CorsPolicy, Router, Server};
///
/// # async fn run(app: Router) {
/// Server::bind("0.0.0.0:3000")
///     .production(true)
///     .middleware(Trace::new())
///     .middleware(CorsAdapter::new(CorsPolicy::with_origins(vec![
///         "https://app.example".to_owned(),
///     ])))
///     .serve(app)
///     .await
///     .unwrap();
/// # }
/// ```
pub struct Server {
    addr: SocketAddr,
    middleware: Vec<Arc<dyn Middleware>>,
    production: bool,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr, middleware: Vec::new(), production: false }
    }

    /// Production mode controls the error responder: stack detail in error
    /// bodies is suppressed when set. Defaults to off.
    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Appends a middleware stage. Stages run in the order they are added.
    pub fn middleware(mut self, mw: impl Middleware) -> Self {
        self.middleware.push(Arc::new(mw));
        self
    }

    /// Starts accepting connections and dispatching them through the
    /// middleware chain into `router`.
    ///
    /// Returns after a graceful shutdown: SIGTERM or Ctrl-C, followed by
    /// in-flight requests completing (or the drain grace period expiring).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // One pipeline for the whole process, shared across connection tasks.
        let pipeline = Arc::new(Pipeline::new(
            self.middleware,
            router,
            ErrorResponder::new(self.production),
        ));

        info!(addr = %self.addr, "strata listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        // Pin the shutdown future so we can poll it in a loop.
        // Futures in Rust must not move in memory after the first poll — that
        // is what `Pin` enforces. `tokio::pin!` pins the future on the stack.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // `biased` makes select! check arms top-to-bottom instead of
                // randomly. We check shutdown first so a SIGTERM immediately
                // stops accepting new connections, even if more are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&pipeline);
                    // TokioIo adapts tokio's AsyncRead/AsyncWrite to the hyper
                    // IO traits.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // `service_fn` turns a plain async function into a
                        // hyper `Service`. The closure is called once per
                        // request on the connection, not once per connection.
                        let svc = service_fn(move |req| {
                            let pipeline = Arc::clone(&pipeline);
                            async move { dispatch(pipeline, req, remote_addr).await }
                        });

                        // `auto::Builder` transparently handles both HTTP/1.1
                        // and HTTP/2 — whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: wait for in-flight connections, but never past the grace
        // period — a stuck connection must not block process exit.
        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(DRAIN_GRACE, drain).await.is_err() {
            warn!(
                abandoned = tasks.len(),
                "drain grace period expired, forcing shutdown"
            );
        }

        info!("strata stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Core hot path: runs one request through the pipeline.
///
/// The error type is [`Infallible`](std::convert::Infallible) — every
/// failure is translated into a response (envelope or minimal fallback)
/// before hyper sees it.
async fn dispatch(
    pipeline: Arc<Pipeline>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, std::convert::Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let url = req.uri().to_string();

    let response = match Request::from_hyper(req, remote_addr).await {
        Ok(request) => pipeline.handle(request).await,
        // The transport died mid-body; the request never entered the chain.
        Err(e) => {
            warn!(method = %method, path = %path, "failed to read request body: {e}");
            pipeline.reject(
                &HttpError::status(400, "Bad Request"),
                &method,
                &path,
                &url,
            )
        }
    };

    Ok(response.into_http())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by `kubectl` and the
/// Kubernetes control plane) and **SIGINT** (Ctrl-C, for local dev).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // `pending()` is a future that never resolves — on non-Unix platforms
    // the SIGTERM arm is effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
