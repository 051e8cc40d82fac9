//! # strata
//!
//! Cross-cutting middleware for hyper services: structured request logging,
//! CORS policy evaluation, and uniform JSON error responses — plus the
//! minimal handler-chain framework they run in.
//!
//! ## The contract
//!
//! Every request takes the same road. The [`middleware::trace::Trace`] stage
//! logs it in and registers the completion hook; the
//! [`middleware::cors::CorsAdapter`] runs the CORS policy evaluator (and
//! answers preflights in place); your handlers do handler things; any
//! failure anywhere becomes one JSON envelope and one log line. Exactly one
//! completion event per request — no matter which path the response took
//! out.
//!
//! What the pipeline guarantees:
//!
//! - **Correlation** — `x-request-id` echoed from the client or generated,
//!   on every response, including errors.
//! - **Redaction** — `authorization`, `cookie`, and `set-cookie` never reach
//!   the log sink in plaintext.
//! - **One terminal event** — the completion hook fires exactly once, with
//!   severity derived from the final status (5xx → error, 4xx → warn,
//!   otherwise info).
//! - **Uniform failures** — every propagated [`HttpError`] exits as
//!   `{"error":{...},"success":false,...}` with stack detail only outside
//!   production.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strata::middleware::{cors::CorsAdapter, trace::Trace};
//! use strata::{Config, CorsPolicy, Request, Response, Router, Server, logging};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load().expect("invalid configuration");
//!     logging::init(config.production, config.log_level.as_deref());
//!
//!     let app = Router::new().get("/users/{id}", get_user);
//!
//!     Server::bind(&config.addr())
//!         .production(config.production)
//!         .middleware(Trace::new())
//!         .middleware(CorsAdapter::new(CorsPolicy::with_origins(
//!             config.allowed_origins.clone(),
//!         )))
//!         .serve(app)
//!         .await
//!         .expect("server error");
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```

mod config;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod logging;
pub mod middleware;
pub mod policy;

pub use config::Config;
pub use error::{Error, HttpError};
pub use handler::{Handler, HandlerFuture};
pub use http::{Method, StatusCode};
pub use policy::{CorsConfig, CorsPolicy, PolicyError, PolicyExchange};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseHead};
pub use router::Router;
pub use server::Server;
